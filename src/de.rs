use serde::de::{Deserialize, Deserializer, Error};

/// Webex identifiers are opaque, but an empty one is never valid and would
/// only resurface later as a confusing 404.
pub fn non_empty<'a, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'a>,
    T: From<String>,
{
    String::deserialize(deserializer).and_then(|s| {
        if s.trim().is_empty() {
            Err(Error::custom("invalid identifier: empty"))
        } else {
            Ok(T::from(s))
        }
    })
}

#[test]
fn test_non_empty() {
    #[derive(Debug, PartialEq, Eq)]
    struct Id(String);

    impl From<String> for Id {
        fn from(s: String) -> Self {
            Id(s)
        }
    }

    #[derive(Debug, PartialEq, Eq, serde::Deserialize)]
    struct T {
        #[serde(deserialize_with = "non_empty")]
        id: Id,
    }

    assert_eq!(
        serde_json::from_str::<T>(r#"{"id": "Y2lzY29zcGFyazovL3Vz"}"#).unwrap(),
        T {
            id: Id("Y2lzY29zcGFyazovL3Vz".into())
        },
    );

    assert!(serde_json::from_str::<T>(r#"{"id": ""}"#).is_err());
    assert!(serde_json::from_str::<T>(r#"{"id": "  "}"#).is_err());
}
