//! Configuration files name compression methods by string (`"deflate"`,
//! `"stored"`, ...), the same spellings accepted by [`str::parse`].

use crate::Compression;
use serde::de::{Deserialize, Deserializer, Error as DeError};
use serde::ser::{Serialize, Serializer};

impl Serialize for Compression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Compression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(|_| D::Error::custom(format!("unknown compression method `{name}`")))
    }
}

#[cfg(test)]
mod tests {
    use crate::Compression;

    #[derive(Debug, serde::Serialize, serde::Deserialize)]
    struct Settings {
        compression: Compression,
    }

    #[test]
    fn test_deserialize_by_name() {
        let settings: Settings = serde_json::from_str(r#"{"compression":"STORED"}"#).unwrap();
        assert_eq!(settings.compression, Compression::Stored);
    }

    #[test]
    fn test_serialize_by_name() {
        let json = serde_json::to_string(&Settings { compression: Compression::Bzip2 }).unwrap();
        assert_eq!(json, r#"{"compression":"bzip2"}"#);
    }

    #[test]
    fn test_deserialize_unknown() {
        let result: Result<Settings, _> = serde_json::from_str(r#"{"compression":"implode"}"#);
        assert!(result.unwrap_err().to_string().contains("unknown compression method `implode`"));
    }
}
