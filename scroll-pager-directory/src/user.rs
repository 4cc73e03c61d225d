//! User records as returned by the randomuser.me API.
//!
//! Every field defaults when absent, so partial payloads (e.g. `?inc=name,email`) still decode.
//! Credentials (`login.password`, hashes, salt) are not modelled and are dropped on
//! decode.
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub gender: String,
    pub name: Name,
    pub location: Location,
    pub email: String,
    pub login: Login,
    pub dob: DatedAge,
    pub registered: DatedAge,
    pub phone: String,
    pub cell: String,
    pub id: Identification,
    pub picture: Picture,
    pub nat: String,
}

impl User {
    /// Stable identity of the record (`login.uuid`).
    pub fn key(&self) -> &str {
        &self.login.uuid
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.name.first, self.name.last)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Name {
    pub title: String,
    pub first: String,
    pub last: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub street: Street,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postcode: Option<Postcode>,
    pub coordinates: Coordinates,
    pub timezone: Timezone,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Street {
    pub number: i64,
    pub name: String,
}

/// Postcodes come back as numbers for some nationalities and strings for others.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Postcode {
    Number(i64),
    Text(String),
}

impl fmt::Display for Postcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coordinates {
    pub latitude: String,
    pub longitude: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timezone {
    pub offset: String,
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Login {
    pub uuid: String,
    pub username: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatedAge {
    pub date: String,
    pub age: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identification {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Picture {
    pub large: String,
    pub medium: String,
    pub thumbnail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "gender": "female",
        "name": { "title": "Ms", "first": "Aino", "last": "Lehto" },
        "location": {
            "street": { "number": 4012, "name": "Hämeenkatu" },
            "city": "Kotka",
            "state": "Kymenlaakso",
            "country": "Finland",
            "postcode": 53370,
            "coordinates": { "latitude": "-31.3", "longitude": "14.9" },
            "timezone": { "offset": "+2:00", "description": "Kaliningrad, South Africa" }
        },
        "email": "aino.lehto@example.com",
        "login": {
            "uuid": "6f1c2f0e-4b7a-4d59-9a5e-0f3a1a4c8b11",
            "username": "bluebird512",
            "password": "secret",
            "sha256": "abc"
        },
        "dob": { "date": "1980-03-02T10:12:45.000Z", "age": 44 },
        "registered": { "date": "2012-07-21T05:31:02.000Z", "age": 12 },
        "phone": "02-123-456",
        "cell": "041-123-45-67",
        "id": { "name": "HETU", "value": null },
        "picture": {
            "large": "https://randomuser.me/api/portraits/women/1.jpg",
            "medium": "https://randomuser.me/api/portraits/med/women/1.jpg",
            "thumbnail": "https://randomuser.me/api/portraits/thumb/women/1.jpg"
        },
        "nat": "FI"
    }"#;

    #[test]
    fn decodes_full_record_and_drops_credentials() {
        let user: User = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(user.key(), "6f1c2f0e-4b7a-4d59-9a5e-0f3a1a4c8b11");
        assert_eq!(user.display_name(), "Aino Lehto");
        assert_eq!(user.location.postcode, Some(Postcode::Number(53370)));
        assert_eq!(user.id.value, None);

        let encoded = serde_json::to_string(&user).unwrap();
        assert!(!encoded.contains("secret"));
    }

    #[test]
    fn postcode_accepts_strings() {
        let user: User =
            serde_json::from_str(r#"{ "location": { "postcode": "EC1A 1BB" } }"#).unwrap();
        let postcode = user.location.postcode.unwrap();
        assert_eq!(postcode.to_string(), "EC1A 1BB");
    }

    #[test]
    fn partial_record_decodes_with_defaults() {
        let user: User = serde_json::from_str(r#"{ "email": "x@example.com" }"#).unwrap();
        assert_eq!(user.email, "x@example.com");
        assert!(user.key().is_empty());
        assert_eq!(user.dob.age, 0);
    }
}
