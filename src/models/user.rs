use serde::{Deserialize, Serialize};

/// Public profile embedded in review listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: Option<String>,
    pub image_url: Option<String>,
}

impl UserProfile {
    /// Profile for a user the store has never been told about
    pub fn anonymous(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            image_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_wire_names() {
        let profile: UserProfile = serde_json::from_value(serde_json::json!({
            "id": "user_1",
            "imageUrl": "https://img/a.png"
        }))
        .unwrap();
        assert_eq!(profile.image_url.as_deref(), Some("https://img/a.png"));
        assert_eq!(profile.name, None);
        assert_eq!(UserProfile::anonymous("user_2").name, None);
    }
}
