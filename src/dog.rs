use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a dog in the owner's profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DogId(pub String);

impl fmt::Display for DogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A dog as supplied by the profile; read-only to the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dog {
    pub id: DogId,
    pub name: String,
    #[serde(default)]
    pub breed: String,
    /// Display-only energy level in percent.
    #[serde(default = "default_energy")]
    pub energy: u8,
}

fn default_energy() -> u8 {
    100
}

impl Dog {
    pub fn new(name: impl Into<String>, breed: impl Into<String>, energy: u8) -> Self {
        let name = name.into();
        Self {
            id: DogId(slug(&name)),
            name,
            breed: breed.into(),
            energy: energy.min(100),
        }
    }
}

/// Parses the `NAME[:BREED[:ENERGY]]` form accepted on the command line.
impl FromStr for Dog {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':').map(str::trim);
        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err("dog name must not be empty".to_string());
        }
        if slug(name).is_empty() {
            return Err(format!(
                "dog name '{}' needs at least one letter or digit",
                name
            ));
        }
        let breed = parts.next().unwrap_or_default();
        let energy = match parts.next() {
            Some(raw) if !raw.is_empty() => raw
                .trim_end_matches('%')
                .parse::<u8>()
                .map_err(|_| format!("invalid energy '{}', expected 0-100", raw))?,
            _ => default_energy(),
        };
        if energy > 100 {
            return Err(format!("invalid energy '{}', expected 0-100", energy));
        }

        Ok(Dog::new(name, breed, energy))
    }
}

fn slug(name: &str) -> String {
    name.chars()
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c.to_ascii_lowercase())
            } else if c.is_whitespace() || c == '-' || c == '_' {
                Some('-')
            } else {
                None
            }
        })
        .collect()
}

/// The list of dogs available for selection on the tracking screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    dogs: Vec<Dog>,
}

impl Roster {
    pub fn new(dogs: Vec<Dog>) -> Self {
        let mut roster = Self::default();
        for dog in dogs {
            roster.push(dog);
        }
        roster
    }

    /// Adds a dog, replacing any existing entry with the same id. Ids ignore
    /// case, so "Rex" and "rex" are the same dog.
    pub fn push(&mut self, dog: Dog) {
        if let Some(existing) = self.dogs.iter_mut().find(|d| d.id == dog.id) {
            log::debug!("replacing {} with {} (same id {})", existing.name, dog.name, dog.id);
            *existing = dog;
        } else {
            self.dogs.push(dog);
        }
    }

    pub fn get(&self, index: usize) -> Option<&Dog> {
        self.dogs.get(index)
    }

    pub fn len(&self) -> usize {
        self.dogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dogs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dog> {
        self.dogs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_name_only() {
        let dog: Dog = "Rex".parse().unwrap();
        assert_eq!(dog.name, "Rex");
        assert_eq!(dog.breed, "");
        assert_eq!(dog.energy, 100);
        assert_eq!(dog.id, DogId("rex".into()));
    }

    #[test]
    fn parse_full_form() {
        let dog: Dog = "Luna Belle:Border Collie:85%".parse().unwrap();
        assert_eq!(dog.name, "Luna Belle");
        assert_eq!(dog.breed, "Border Collie");
        assert_eq!(dog.energy, 85);
        assert_eq!(dog.id.to_string(), "luna-belle");
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!("".parse::<Dog>().is_err());
        assert!("Rex:Lab:lots".parse::<Dog>().is_err());
        assert!("Rex:Lab:150".parse::<Dog>().is_err());
    }

    #[test]
    fn parse_rejects_names_without_an_id() {
        assert!("!!!".parse::<Dog>().is_err());
        assert!("?? :Lab".parse::<Dog>().is_err());
        assert_eq!("R2-D2!".parse::<Dog>().unwrap().id, DogId("r2-d2".into()));
    }

    #[test]
    fn names_differing_only_in_case_share_an_id() {
        let roster = Roster::new(vec![
            "Rex:Lab".parse().unwrap(),
            "rex:Labrador".parse().unwrap(),
        ]);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.get(0).unwrap().name, "rex");
        assert_eq!(roster.get(0).unwrap().breed, "Labrador");
    }

    #[test]
    fn roster_replaces_duplicate_ids() {
        let mut roster = Roster::new(vec![Dog::new("Rex", "Lab", 90)]);
        roster.push(Dog::new("Rex", "Labrador", 70));
        roster.push(Dog::new("Pip", "Terrier", 60));

        assert_eq!(roster.len(), 2);
        assert_eq!(roster.get(0).unwrap().breed, "Labrador");
        assert_eq!(roster.get(1).unwrap().id, DogId("pip".into()));
        assert!(roster.get(2).is_none());
    }

    #[test]
    fn energy_is_clamped() {
        assert_eq!(Dog::new("Rex", "", 250).energy, 100);
    }

    #[test]
    fn deserializes_with_defaults() {
        let dog: Dog = serde_json::from_str(r#"{"id":"rex","name":"Rex"}"#).unwrap();
        assert_eq!(dog.energy, 100);
        assert!(dog.breed.is_empty());
    }
}
