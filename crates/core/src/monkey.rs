use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

/// A single monkey species as served by the remote collection.
///
/// Every attribute may be missing upstream, so each one is optional and
/// serializes as `null` when absent. A value of the wrong type decodes as
/// absent rather than rejecting the whole record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Monkey {
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub location: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub details: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub image: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub population: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub latitude: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub longitude: Option<f64>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl Monkey {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_population(mut self, population: i64) -> Self {
        self.population = Some(population);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn matches_name(&self, query: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|name| name.to_lowercase() == query.to_lowercase())
    }

    pub fn value_of(&self, field: MonkeyField) -> Value {
        match field {
            MonkeyField::Name => self.name.clone().into(),
            MonkeyField::Location => self.location.clone().into(),
            MonkeyField::Details => self.details.clone().into(),
            MonkeyField::Image => self.image.clone().into(),
            MonkeyField::Population => self.population.into(),
            MonkeyField::Latitude => self.latitude.into(),
            MonkeyField::Longitude => self.longitude.into(),
        }
    }

    /// Serialized form restricted to `fields`, in the order given.
    pub fn project(&self, fields: &[MonkeyField]) -> Map<String, Value> {
        fields
            .iter()
            .map(|&field| (field.as_str().to_string(), self.value_of(field)))
            .collect()
    }

    /// Orders two monkeys by one attribute. Missing values sort lowest.
    pub fn compare_by(&self, other: &Self, field: MonkeyField) -> Ordering {
        fn cmp_opt<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Ordering {
            match (a, b) {
                (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            }
        }

        match field {
            MonkeyField::Name => cmp_opt(self.name.as_deref(), other.name.as_deref()),
            MonkeyField::Location => cmp_opt(self.location.as_deref(), other.location.as_deref()),
            MonkeyField::Details => cmp_opt(self.details.as_deref(), other.details.as_deref()),
            MonkeyField::Image => cmp_opt(self.image.as_deref(), other.image.as_deref()),
            MonkeyField::Population => cmp_opt(self.population, other.population),
            MonkeyField::Latitude => cmp_opt(self.latitude, other.latitude),
            MonkeyField::Longitude => cmp_opt(self.longitude, other.longitude),
        }
    }
}

/// The closed vocabulary of monkey attributes.
///
/// Shared by the dispatcher (projection, sorting) and by the argument
/// corrector (valid display names), so both agree on what a field is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MonkeyField {
    Name,
    Location,
    Details,
    Image,
    Population,
    Latitude,
    Longitude,
}

impl MonkeyField {
    pub const ALL: [MonkeyField; 7] = [
        MonkeyField::Name,
        MonkeyField::Location,
        MonkeyField::Details,
        MonkeyField::Image,
        MonkeyField::Population,
        MonkeyField::Latitude,
        MonkeyField::Longitude,
    ];

    /// Display name, identical to the wire key.
    pub fn as_str(&self) -> &'static str {
        match self {
            MonkeyField::Name => "Name",
            MonkeyField::Location => "Location",
            MonkeyField::Details => "Details",
            MonkeyField::Image => "Image",
            MonkeyField::Population => "Population",
            MonkeyField::Latitude => "Latitude",
            MonkeyField::Longitude => "Longitude",
        }
    }

    /// Exact, case-sensitive lookup by display name.
    pub fn from_display(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    pub fn from_display_ignore_case(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(name))
    }

    pub fn display_names() -> Vec<&'static str> {
        Self::ALL.iter().map(MonkeyField::as_str).collect()
    }
}

impl fmt::Display for MonkeyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
