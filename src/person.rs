// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Person entity.
//!
//! The [`Person`] is the unit that flows from the record store into the
//! search index. Every field except the id is optional so the same type can
//! carry a partial update into [`Person::merge_from`].
//!
//! # Example
//!
//! ```
//! use person_search_sync::{Person, Address};
//!
//! let mut stored = Person::new("Joe Smith").with_children(2);
//! stored.id = Some(7);
//!
//! let patch = Person {
//!     address: Some(Address { city: Some("Lyon".into()), ..Default::default() }),
//!     ..Default::default()
//! };
//! stored.merge_from(&patch);
//!
//! assert_eq!(stored.id, Some(7));
//! assert_eq!(stored.name.as_deref(), Some("Joe Smith"));
//! assert_eq!(stored.address.unwrap().city.as_deref(), Some("Lyon"));
//! ```

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Record identity. Immutable once assigned by the record store.
pub type PersonId = i64;

/// Geographic point, serialized the way search engines expect `geo_point`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Postal address nested in a [`Person`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countrycode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

impl Address {
    /// Overwrite every field that is set on `incoming`.
    pub fn merge_from(&mut self, incoming: &Address) {
        if let Some(country) = &incoming.country {
            self.country = Some(country.clone());
        }
        if let Some(code) = &incoming.countrycode {
            self.countrycode = Some(code.clone());
        }
        if let Some(city) = &incoming.city {
            self.city = Some(city.clone());
        }
        if let Some(location) = incoming.location {
            self.location = Some(location);
        }
    }
}

/// A person record, canonical in the record store and mirrored in the index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PersonId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<u32>,
}

impl Person {
    /// Create an unsaved person with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_date_of_birth(mut self, date: NaiveDate) -> Self {
        self.date_of_birth = Some(date);
        self
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_children(mut self, children: u32) -> Self {
        self.children = Some(children);
        self
    }

    /// Document id used in the search index.
    #[must_use]
    pub fn id_as_string(&self) -> Option<String> {
        self.id.map(|id| id.to_string())
    }

    /// Year of birth, if known.
    #[must_use]
    pub fn birth_year(&self) -> Option<i32> {
        self.date_of_birth.map(|d| d.year())
    }

    /// Field-by-field merge of `incoming` onto `self`.
    ///
    /// Only fields that are `Some` on `incoming` overwrite. The address is
    /// merged recursively. The stored id is never touched.
    pub fn merge_from(&mut self, incoming: &Person) {
        if let Some(name) = &incoming.name {
            self.name = Some(name.clone());
        }
        if let Some(gender) = &incoming.gender {
            self.gender = Some(gender.clone());
        }
        if let Some(date) = incoming.date_of_birth {
            self.date_of_birth = Some(date);
        }
        if let Some(children) = incoming.children {
            self.children = Some(children);
        }
        if let Some(address) = &incoming.address {
            match self.address.as_mut() {
                Some(stored) => stored.merge_from(address),
                None => self.address = Some(address.clone()),
            }
        }
    }
}
