use serde::{Deserialize, Serialize};

/// Which addresses an origin may act on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub origin: String,
    pub allows_all: bool,
    pub addresses: Vec<String>,
}

impl Permission {
    pub fn new(origin: impl Into<String>, grant: Grant) -> Self {
        let origin = origin.into();
        match grant {
            Grant::All => Permission {
                origin,
                allows_all: true,
                addresses: Vec::new(),
            },
            Grant::Addresses(addresses) => Permission {
                origin,
                allows_all: false,
                addresses,
            },
        }
    }

    pub fn allows(&self, address: &str) -> bool {
        self.allows_all || self.addresses.iter().any(|a| a == address)
    }
}

/// Second argument of `allow`: `true` on the wire for every address, or a list.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "GrantRepr")]
pub enum Grant {
    All,
    Addresses(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GrantRepr {
    Flag(bool),
    Addresses(Vec<String>),
}

impl TryFrom<GrantRepr> for Grant {
    type Error = &'static str;

    fn try_from(repr: GrantRepr) -> Result<Self, Self::Error> {
        match repr {
            GrantRepr::Flag(true) => Ok(Grant::All),
            GrantRepr::Flag(false) => Err("a grant must be `true` or a list of addresses"),
            GrantRepr::Addresses(addresses) => Ok(Grant::Addresses(addresses)),
        }
    }
}

impl Serialize for Grant {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Grant::All => serializer.serialize_bool(true),
            Grant::Addresses(addresses) => addresses.serialize(serializer),
        }
    }
}
