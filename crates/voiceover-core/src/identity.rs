//! Authenticated user snapshot and its preferences bag.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Largest integer an `f64` holds exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Any JSON number; other values read as absent.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite()))
}

/// JSON truthiness: `null`, `false`, `0` and `""` are false.
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

/// Whole counts go out as JSON integers, anything else as a float.
#[allow(clippy::cast_possible_truncation, clippy::ref_option)]
fn serialize_count<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match *value {
        Some(n) if n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER => {
            serializer.serialize_i64(n as i64)
        }
        Some(n) => serializer.serialize_f64(n),
        None => serializer.serialize_none(),
    }
}

/// User preferences as stored by the account service
///
/// The credit fields are typed; every other key is carried through
/// untouched so a preferences update never drops data written elsewhere.
/// Counters accept any JSON number and the awarded flag follows JSON
/// truthiness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Total credits ever granted
    #[serde(
        default,
        deserialize_with = "lenient_count",
        serialize_with = "serialize_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub credits_total: Option<f64>,
    /// Credits consumed so far
    #[serde(
        default,
        deserialize_with = "lenient_count",
        serialize_with = "serialize_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub credits_used: Option<f64>,
    /// Size of the one-time welcome grant, once awarded
    #[serde(
        default,
        deserialize_with = "lenient_count",
        serialize_with = "serialize_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub welcome_credits: Option<f64>,
    /// Set once the welcome grant has been applied
    #[serde(default, deserialize_with = "truthy")]
    pub welcome_credits_awarded: bool,
    /// Unrecognized keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Preferences {
    /// Credits granted so far
    #[must_use]
    pub fn credits_total(&self) -> f64 {
        self.credits_total.unwrap_or(0.0)
    }

    /// Credits consumed so far
    #[must_use]
    pub fn credits_used(&self) -> f64 {
        self.credits_used.unwrap_or(0.0)
    }

    /// Credits still available, never below zero
    #[must_use]
    pub fn credits_remaining(&self) -> f64 {
        (self.credits_total() - self.credits_used()).max(0.0)
    }

    /// These preferences with the welcome grant applied
    ///
    /// Adds `amount` to the total, records the amount and sets the awarded
    /// flag; usage and unknown keys are kept.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn with_welcome_credits(&self, amount: u64) -> Self {
        let amount = amount as f64;
        Self {
            credits_total: Some(self.credits_total() + amount),
            credits_used: Some(self.credits_used()),
            welcome_credits: Some(amount),
            welcome_credits_awarded: true,
            extra: self.extra.clone(),
        }
    }
}

/// Snapshot of the authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Account identifier
    #[serde(rename = "$id")]
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Email address
    #[serde(default)]
    pub email: String,
    /// Whether the email address is verified
    #[serde(default)]
    pub email_verification: bool,
    /// Whether the account is active
    #[serde(default = "default_status")]
    pub status: bool,
    /// Registration timestamp as reported by the service
    #[serde(default)]
    pub registration: String,
    /// Preferences bag holding the credit counters
    #[serde(default)]
    pub prefs: Preferences,
    /// Remaining service fields, kept so the cached snapshot matches the remote record
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const fn default_status() -> bool {
    true
}

impl Identity {
    /// Create an identity with empty preferences
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            email_verification: false,
            status: true,
            registration: String::new(),
            prefs: Preferences::default(),
            extra: Map::new(),
        }
    }

    /// Replace the preferences
    #[must_use]
    pub fn with_prefs(mut self, prefs: Preferences) -> Self {
        self.prefs = prefs;
        self
    }

    /// Whether the one-time welcome grant has already been applied
    #[must_use]
    pub const fn welcome_credits_awarded(&self) -> bool {
        self.prefs.welcome_credits_awarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_from_account_json() {
        let identity: Identity = serde_json::from_value(json!({
            "$id": "64f1c2",
            "$createdAt": "2025-01-01T00:00:00.000+00:00",
            "name": "Ada",
            "email": "ada@example.com",
            "emailVerification": true,
            "status": true,
            "registration": "2025-01-01T00:00:00.000+00:00",
            "prefs": { "creditsTotal": 2000, "creditsUsed": 150, "theme": "dark" }
        }))
        .unwrap();

        assert_eq!(identity.id, "64f1c2");
        assert!(identity.email_verification);
        assert_eq!(identity.prefs.credits_remaining(), 1850.0);
        assert!(!identity.welcome_credits_awarded());
        assert_eq!(identity.prefs.extra["theme"], "dark");
        assert!(identity.extra.contains_key("$createdAt"));
    }

    #[test]
    fn test_identity_roundtrip_keeps_unknown_fields() {
        let value = json!({
            "$id": "u1",
            "name": "A",
            "email": "a@b.com",
            "emailVerification": false,
            "status": true,
            "registration": "",
            "prefs": { "welcomeCreditsAwarded": true, "voice": "Alex" },
            "labels": ["beta"]
        });
        let identity: Identity = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(serde_json::to_value(&identity).unwrap(), value);
    }

    #[test]
    fn test_minimal_identity_defaults() {
        let identity: Identity = serde_json::from_value(json!({ "$id": "u2" })).unwrap();
        assert!(identity.status);
        assert_eq!(identity.prefs, Preferences::default());
    }

    #[test]
    fn test_welcome_credits_on_empty_prefs() {
        let prefs = Preferences::default().with_welcome_credits(2000);
        assert_eq!(prefs.credits_total, Some(2000.0));
        assert_eq!(prefs.credits_used, Some(0.0));
        assert_eq!(prefs.welcome_credits, Some(2000.0));
        assert!(prefs.welcome_credits_awarded);
    }

    #[test]
    fn test_welcome_credits_keep_existing_state() {
        let mut prefs: Preferences = serde_json::from_value(json!({
            "creditsTotal": 300,
            "creditsUsed": 120,
            "voice": "Julia"
        }))
        .unwrap();
        prefs = prefs.with_welcome_credits(2000);

        assert_eq!(prefs.credits_total(), 2300.0);
        assert_eq!(prefs.credits_used(), 120.0);
        assert_eq!(prefs.credits_remaining(), 2180.0);
        assert_eq!(prefs.extra["voice"], "Julia");
    }

    #[test]
    fn test_credits_remaining_saturates() {
        let prefs = Preferences {
            credits_total: Some(10.0),
            credits_used: Some(25.0),
            ..Preferences::default()
        };
        assert_eq!(prefs.credits_remaining(), 0.0);
    }

    #[test]
    fn test_fractional_and_non_numeric_counters() {
        let identity: Identity = serde_json::from_value(json!({
            "$id": "u3",
            "prefs": {
                "creditsTotal": "lots",
                "creditsUsed": 12.5,
                "welcomeCredits": null,
                "welcomeCreditsAwarded": 1
            }
        }))
        .unwrap();

        let prefs = &identity.prefs;
        assert_eq!(prefs.credits_total, None);
        assert_eq!(prefs.credits_used, Some(12.5));
        assert_eq!(prefs.welcome_credits, None);
        assert!(prefs.welcome_credits_awarded);
        assert_eq!(prefs.credits_remaining(), 0.0);
    }

    #[test]
    fn test_awarded_flag_follows_truthiness() {
        for (raw, expected) in [
            (json!(null), false),
            (json!(0), false),
            (json!(""), false),
            (json!("yes"), true),
            (json!(true), true),
        ] {
            let prefs: Preferences =
                serde_json::from_value(json!({ "welcomeCreditsAwarded": raw })).unwrap();
            assert_eq!(prefs.welcome_credits_awarded, expected, "{raw}");
        }
    }

    #[test]
    fn test_counters_serialize_whole_values_as_integers() {
        let prefs = Preferences {
            credits_total: Some(2000.0),
            credits_used: Some(12.5),
            ..Preferences::default()
        }
        .with_welcome_credits(500);

        assert_eq!(
            serde_json::to_value(&prefs).unwrap(),
            json!({
                "creditsTotal": 2500,
                "creditsUsed": 12.5,
                "welcomeCredits": 500,
                "welcomeCreditsAwarded": true
            })
        );
    }
}
