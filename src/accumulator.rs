//! Deduplicating city accumulator
//!
//! Pages of search results overlap (the directory has no stable cursor), so
//! every incoming batch is filtered against the identity keys already shown.

use std::collections::HashSet;

use crate::state::City;

/// `lowercase(name)|lowercase(country)|timezone`
pub fn identity_key(city: &City) -> String {
    format!(
        "{}|{}|{}",
        city.name.to_lowercase(),
        city.country.to_lowercase(),
        city.timezone
    )
}

/// Outcome of merging one batch into the accumulated list
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Accumulated {
    /// Cities not seen before, in incoming order
    pub new_cities: Vec<City>,
    /// `existing_keys` plus the keys of `new_cities`
    pub updated_keys: HashSet<String>,
}

/// Keep the cities whose identity key is not yet known.
///
/// Duplicates inside `incoming` are dropped as well, so replaying the same
/// batch against `updated_keys` yields nothing new.
pub fn accumulate(existing_keys: &HashSet<String>, incoming: Vec<City>) -> Accumulated {
    let mut updated_keys = existing_keys.clone();
    let new_cities = incoming
        .into_iter()
        .filter(|city| updated_keys.insert(identity_key(city)))
        .collect();

    Accumulated {
        new_cities,
        updated_keys,
    }
}
