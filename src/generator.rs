// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Synthetic person factory for population runs.
//!
//! Produces plausible persons from fixed name and location tables. The
//! generator owns its RNG so runs can be made reproducible with
//! [`PersonGenerator::seeded`].

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::person::{Address, GeoPoint, Person};

const FIRST_NAMES_MALE: &[&str] = &[
    "David", "Thomas", "Lucas", "Hugo", "Louis", "Paul", "Marco", "Luca", "James", "John",
    "Pedro", "Carlos", "Hans", "Lars",
];

const FIRST_NAMES_FEMALE: &[&str] = &[
    "Marie", "Emma", "Julia", "Chloe", "Sofia", "Giulia", "Anna", "Laura", "Olivia", "Maria",
    "Ines", "Ingrid", "Elena", "Clara",
];

const LAST_NAMES: &[&str] = &[
    "Martin", "Bernard", "Dubois", "Rossi", "Bianchi", "Smith", "Johnson", "Garcia",
    "Fernandez", "Muller", "Schmidt", "Jensen", "Silva", "Moreau",
];

/// (city, country, country code, lat, lon)
const PLACES: &[(&str, &str, &str, f64, f64)] = &[
    ("Paris", "France", "FR", 48.85, 2.35),
    ("Lyon", "France", "FR", 45.76, 4.84),
    ("Rome", "Italy", "IT", 41.90, 12.50),
    ("Milan", "Italy", "IT", 45.46, 9.19),
    ("London", "United Kingdom", "GB", 51.51, -0.13),
    ("Madrid", "Spain", "ES", 40.42, -3.70),
    ("Berlin", "Germany", "DE", 52.52, 13.40),
    ("Lisbon", "Portugal", "PT", 38.72, -9.14),
    ("Copenhagen", "Denmark", "DK", 55.68, 12.57),
    ("New York", "United States", "US", 40.71, -74.01),
];

const MIN_BIRTH_YEAR: i32 = 1940;
const MAX_BIRTH_YEAR: i32 = 2009;

/// Random person generator.
pub struct PersonGenerator {
    rng: StdRng,
}

impl PersonGenerator {
    /// Generator seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for tests and repeatable runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate one unsaved person.
    pub fn person(&mut self) -> Person {
        let female = self.rng.gen_bool(0.5);
        let first = if female {
            pick(&mut self.rng, FIRST_NAMES_FEMALE)
        } else {
            pick(&mut self.rng, FIRST_NAMES_MALE)
        };
        let last = pick(&mut self.rng, LAST_NAMES);
        let (city, country, code, lat, lon) = *pick(&mut self.rng, PLACES);

        Person::new(format!("{} {}", first, last))
            .with_gender(if female { "female" } else { "male" })
            .with_date_of_birth(self.date_of_birth())
            .with_address(Address {
                country: Some(country.to_string()),
                countrycode: Some(code.to_string()),
                city: Some(city.to_string()),
                location: Some(GeoPoint::new(
                    lat + self.rng.gen_range(-0.05..0.05),
                    lon + self.rng.gen_range(-0.05..0.05),
                )),
            })
            .with_children(self.rng.gen_range(0..=5))
    }

    /// The two fixed persons every population run starts with.
    pub fn seeds(&mut self) -> [Person; 2] {
        let mut joe = self.person();
        joe.name = Some("Joe Smith".into());
        joe.address = Some(Address {
            country: Some("France".into()),
            countrycode: Some("FR".into()),
            city: Some("Paris".into()),
            location: Some(GeoPoint::new(48.84, 2.31)),
        });

        let mut france_gall = self.person();
        france_gall.name = Some("France Gall".into());
        france_gall.gender = Some("female".into());
        france_gall.address = Some(Address {
            country: Some("Italy".into()),
            countrycode: Some("IT".into()),
            city: Some("Ischia".into()),
            location: Some(GeoPoint::new(40.72, 13.90)),
        });

        [joe, france_gall]
    }

    fn date_of_birth(&mut self) -> NaiveDate {
        let year = self.rng.gen_range(MIN_BIRTH_YEAR..=MAX_BIRTH_YEAR);
        let ordinal = self.rng.gen_range(1..=365);
        NaiveDate::from_yo_opt(year, ordinal).unwrap_or(NaiveDate::MIN)
    }
}

impl Default for PersonGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn pick<'a, T>(rng: &mut StdRng, items: &'a [T]) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}
