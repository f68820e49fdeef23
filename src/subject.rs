//! Parsing of `/C=../ST=../O=..` style subject strings.

use std::{fmt, str::FromStr};

use rcgen::{DistinguishedName, DnType};

/// The distinguished-name fields a subject string may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectField {
    Country,
    StateOrProvince,
    Locality,
    Organization,
    OrganizationalUnit,
    CommonName,
}

impl SubjectField {
    pub fn key(self) -> &'static str {
        match self {
            Self::Country => "C",
            Self::StateOrProvince => "ST",
            Self::Locality => "L",
            Self::Organization => "O",
            Self::OrganizationalUnit => "OU",
            Self::CommonName => "CN",
        }
    }

    fn dn_type(self) -> DnType {
        match self {
            Self::Country => DnType::CountryName,
            Self::StateOrProvince => DnType::StateOrProvinceName,
            Self::Locality => DnType::LocalityName,
            Self::Organization => DnType::OrganizationName,
            Self::OrganizationalUnit => DnType::OrganizationalUnitName,
            Self::CommonName => DnType::CommonName,
        }
    }
}

impl FromStr for SubjectField {
    type Err = ();

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        match key {
            "C" => Ok(Self::Country),
            "ST" => Ok(Self::StateOrProvince),
            "L" => Ok(Self::Locality),
            "O" => Ok(Self::Organization),
            "OU" => Ok(Self::OrganizationalUnit),
            "CN" => Ok(Self::CommonName),
            _ => Err(()),
        }
    }
}

/// Subject fields in the order they first appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectDescriptor {
    fields: Vec<(SubjectField, String)>,
}

impl SubjectDescriptor {
    /// Parses `/KEY=VALUE` segments. Unknown keys and malformed segments are
    /// skipped, a repeated key keeps its position but takes the last value.
    pub fn parse(subject: &str) -> Self {
        let mut descriptor = Self::default();
        // anything before the first '/' is not a segment
        for segment in subject.split('/').skip(1) {
            let Some((key, value)) = segment.split_once('=') else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            if let Ok(field) = key.parse() {
                descriptor.set(field, value);
            }
        }
        descriptor
    }

    pub fn set(&mut self, field: SubjectField, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn get(&self, field: SubjectField) -> Option<&str> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (SubjectField, &str)> {
        self.fields.iter().map(|(f, v)| (*f, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<&SubjectDescriptor> for DistinguishedName {
    fn from(value: &SubjectDescriptor) -> Self {
        let mut dn = Self::new();
        for (field, val) in value.iter() {
            dn.push(field.dn_type(), val);
        }
        dn
    }
}

impl fmt::Display for SubjectDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (field, value) in self.iter() {
            write!(f, "/{}={}", field.key(), value)?;
        }
        Ok(())
    }
}
