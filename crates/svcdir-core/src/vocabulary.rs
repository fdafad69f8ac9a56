//! Keyword tables driving query interpretation.
//!
//! The built-in [`Vocabulary::default`] covers the services directory's
//! launch region. Deployments override it with a YAML file (see
//! [`load_vocabulary`]) rather than code changes.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;
use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSynonyms {
    /// Value stored in the `service_type` column.
    pub canonical: String,
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductTerm {
    pub term: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    /// Service types whose providers carry this product.
    pub service_types: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    NearMe,
    Verified,
    OpenNow,
    Emergency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierPhrase {
    pub kind: ModifierKind,
    pub phrases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    pub name: String,
    pub abbreviation: String,
    /// Geographic center, substituted when geocoding an address fails.
    pub latitude: f64,
    pub longitude: f64,
    pub default_city: String,
    pub default_zip: String,
}

impl StateEntry {
    #[must_use]
    pub fn centroid(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultLocation {
    pub city: String,
    pub state: String,
    pub zip: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl DefaultLocation {
    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchRadii {
    /// Explicit state search and the static default anchor.
    pub default_miles: f64,
    pub near_me_miles: f64,
    pub zip_miles: f64,
}

impl Default for SearchRadii {
    fn default() -> Self {
        Self {
            default_miles: 50.0,
            near_me_miles: 10.0,
            zip_miles: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub services: Vec<ServiceSynonyms>,
    #[serde(default)]
    pub products: Vec<ProductTerm>,
    #[serde(default)]
    pub modifiers: Vec<ModifierPhrase>,
    pub states: Vec<StateEntry>,
    pub default_location: DefaultLocation,
    #[serde(default)]
    pub radii: SearchRadii,
}

impl Vocabulary {
    /// Looks up a state by its two-letter abbreviation (case-insensitive).
    #[must_use]
    pub fn state_by_abbreviation(&self, abbreviation: &str) -> Option<&StateEntry> {
        self.states
            .iter()
            .find(|s| s.abbreviation.eq_ignore_ascii_case(abbreviation.trim()))
    }

    /// Looks up a state by its full name (case-insensitive, whitespace-tolerant).
    #[must_use]
    pub fn state_by_name(&self, name: &str) -> Option<&StateEntry> {
        let wanted = collapse_whitespace(name);
        self.states
            .iter()
            .find(|s| collapse_whitespace(&s.name) == wanted)
    }

    /// Resolves either a full name or an abbreviation to a state entry.
    #[must_use]
    pub fn find_state(&self, value: &str) -> Option<&StateEntry> {
        self.state_by_abbreviation(value)
            .or_else(|| self.state_by_name(value))
    }

    /// The state entry backing the default anchor.
    #[must_use]
    pub fn default_state(&self) -> Option<&StateEntry> {
        self.state_by_abbreviation(&self.default_location.state)
    }
}

fn collapse_whitespace(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn words(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

fn service(canonical: &str, synonyms: &[&str]) -> ServiceSynonyms {
    ServiceSynonyms {
        canonical: canonical.to_string(),
        synonyms: words(synonyms),
    }
}

fn state(
    name: &str,
    abbreviation: &str,
    center: (f64, f64),
    default_city: &str,
    default_zip: &str,
) -> StateEntry {
    StateEntry {
        name: name.to_string(),
        abbreviation: abbreviation.to_string(),
        latitude: center.0,
        longitude: center.1,
        default_city: default_city.to_string(),
        default_zip: default_zip.to_string(),
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            services: vec![
                service(
                    "veterinarian",
                    &[
                        "vet",
                        "veterinarian",
                        "veterinary",
                        "holistic vet",
                        "animal hospital",
                        "animal clinic",
                        "pet clinic",
                    ],
                ),
                service(
                    "groomer",
                    &["groomer", "grooming", "dog groomer", "pet groomer", "mobile groomer"],
                ),
                service("dog_park", &["dog park", "off leash park", "bark park"]),
                service("trainer", &["trainer", "training", "obedience", "dog trainer"]),
                service("boarding", &["boarding", "kennel", "pet hotel"]),
                service("daycare", &["daycare", "day care", "doggy daycare"]),
                service("pet_sitter", &["pet sitter", "pet sitting", "sitter"]),
                service("dog_walker", &["dog walker", "dog walking", "walker"]),
            ],
            products: vec![
                ProductTerm {
                    term: "food".to_string(),
                    synonyms: words(&["kibble", "treats", "treat", "raw food"]),
                    service_types: words(&["pet_store"]),
                },
                ProductTerm {
                    term: "toys".to_string(),
                    synonyms: words(&["toy", "chew"]),
                    service_types: words(&["pet_store"]),
                },
                ProductTerm {
                    term: "supplements".to_string(),
                    synonyms: words(&["supplement", "vitamins"]),
                    service_types: words(&["pet_store", "veterinarian"]),
                },
            ],
            modifiers: vec![
                ModifierPhrase {
                    kind: ModifierKind::NearMe,
                    phrases: words(&["near me", "nearby", "close to me", "around me"]),
                },
                ModifierPhrase {
                    kind: ModifierKind::Verified,
                    phrases: words(&["verified", "certified", "trusted"]),
                },
                ModifierPhrase {
                    kind: ModifierKind::OpenNow,
                    phrases: words(&["open now", "open today"]),
                },
                ModifierPhrase {
                    kind: ModifierKind::Emergency,
                    phrases: words(&["emergency", "24 hour", "24 hours", "urgent"]),
                },
            ],
            states: vec![
                state("Indiana", "IN", (39.894_2, -86.281_6), "Indianapolis", "46204"),
                state("Ohio", "OH", (40.286_2, -82.793_7), "Columbus", "43215"),
                state("Illinois", "IL", (40.041_7, -89.196_5), "Chicago", "60601"),
                state("Michigan", "MI", (44.346_7, -85.410_2), "Detroit", "48226"),
                state("Kentucky", "KY", (37.534_7, -85.302_1), "Louisville", "40202"),
            ],
            default_location: DefaultLocation {
                city: "Indianapolis".to_string(),
                state: "IN".to_string(),
                zip: "46204".to_string(),
                latitude: 39.768_4,
                longitude: -86.158_1,
            },
            radii: SearchRadii::default(),
        }
    }
}

/// Load and validate a vocabulary from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_vocabulary(path: &Path) -> Result<Vocabulary, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::VocabularyFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let vocabulary: Vocabulary = serde_yaml::from_str(&content)?;
    validate_vocabulary(&vocabulary)?;

    Ok(vocabulary)
}

/// Validate vocabulary invariants.
///
/// # Errors
///
/// Returns `ConfigError::VocabularyValidation` describing the first violation.
pub fn validate_vocabulary(vocabulary: &Vocabulary) -> Result<(), ConfigError> {
    let invalid = |msg: String| Err(ConfigError::VocabularyValidation(msg));

    if vocabulary.services.is_empty() {
        return invalid("at least one service synonym group is required".to_string());
    }
    for group in &vocabulary.services {
        if group.canonical.trim().is_empty() {
            return invalid("service canonical name must not be empty".to_string());
        }
        if group.synonyms.iter().any(|s| s.trim().is_empty()) {
            return invalid(format!("empty synonym for service '{}'", group.canonical));
        }
    }
    for product in &vocabulary.products {
        if product.term.trim().is_empty() || product.service_types.is_empty() {
            return invalid(format!(
                "product term '{}' needs a name and at least one service type",
                product.term
            ));
        }
    }

    let mut seen = HashSet::new();
    for entry in &vocabulary.states {
        let abbr = entry.abbreviation.as_str();
        if abbr.len() != 2 || !abbr.chars().all(|c| c.is_ascii_uppercase()) {
            return invalid(format!(
                "state abbreviation '{abbr}' must be two uppercase letters"
            ));
        }
        if !seen.insert(abbr) {
            return invalid(format!("duplicate state abbreviation '{abbr}'"));
        }
        if !entry.centroid().is_valid() {
            return invalid(format!("state '{abbr}' has invalid coordinates"));
        }
    }

    if vocabulary.default_state().is_none() {
        return invalid(format!(
            "default location state '{}' is not in the state table",
            vocabulary.default_location.state
        ));
    }
    if !vocabulary.default_location.coordinates().is_valid() {
        return invalid("default location has invalid coordinates".to_string());
    }

    let radii = vocabulary.radii;
    if [radii.default_miles, radii.near_me_miles, radii.zip_miles]
        .iter()
        .any(|r| !r.is_finite() || *r <= 0.0)
    {
        return invalid("search radii must be positive".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_vocabulary_is_valid() {
        validate_vocabulary(&Vocabulary::default()).expect("built-in vocabulary must validate");
    }

    #[test]
    fn find_state_accepts_name_and_abbreviation() {
        let vocab = Vocabulary::default();
        assert_eq!(vocab.find_state("ohio").map(|s| s.abbreviation.as_str()), Some("OH"));
        assert_eq!(vocab.find_state("OH").map(|s| s.name.as_str()), Some("Ohio"));
        assert_eq!(vocab.find_state("  INDIANA ").map(|s| s.abbreviation.as_str()), Some("IN"));
        assert!(vocab.find_state("Texas").is_none());
    }

    #[test]
    fn default_state_is_indiana() {
        let vocab = Vocabulary::default();
        assert_eq!(vocab.default_state().map(|s| s.name.as_str()), Some("Indiana"));
    }

    #[test]
    fn duplicate_abbreviation_fails_validation() {
        let mut vocab = Vocabulary::default();
        let dup = vocab.states[0].clone();
        vocab.states.push(dup);
        let err = validate_vocabulary(&vocab).unwrap_err();
        assert!(matches!(err, ConfigError::VocabularyValidation(ref m) if m.contains("duplicate")));
    }

    #[test]
    fn unknown_default_state_fails_validation() {
        let mut vocab = Vocabulary::default();
        vocab.default_location.state = "TX".to_string();
        assert!(validate_vocabulary(&vocab).is_err());
    }

    #[test]
    fn yaml_round_trip_through_loader() {
        let yaml = serde_yaml::to_string(&Vocabulary::default()).expect("serialize");
        let dir = std::env::temp_dir().join(format!("svcdir-vocab-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("vocabulary.yaml");
        std::fs::write(&path, yaml).expect("write yaml");

        let loaded = load_vocabulary(&path).expect("load vocabulary");
        assert_eq!(loaded, Vocabulary::default());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn loader_reports_missing_file() {
        let err = load_vocabulary(Path::new("/nonexistent/vocabulary.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::VocabularyFileIo { .. }));
    }

    #[test]
    fn radii_default_when_omitted() {
        let yaml = r"
services:
  - canonical: groomer
    synonyms: [groomer]
states:
  - name: Indiana
    abbreviation: IN
    latitude: 39.89
    longitude: -86.28
    default_city: Indianapolis
    default_zip: '46204'
default_location:
  city: Indianapolis
  state: IN
  zip: '46204'
  latitude: 39.77
  longitude: -86.16
";
        let vocab: Vocabulary = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(vocab.radii, SearchRadii::default());
        assert!(vocab.products.is_empty());
        validate_vocabulary(&vocab).expect("valid");
    }
}
