//! Identità autenticate e record di sessione

use serde::{Deserialize, Serialize};

/// Ruolo dell'utente autenticato
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Sponsor,
    Student,
}

/// Identità allegata alla richiesta dopo l'autenticazione
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: Role,
}

impl Identity {
    pub fn sponsor(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
            role: Role::Sponsor,
        }
    }

    pub fn student(email: impl Into<String>, name: Option<String>) -> Self {
        Self {
            email: email.into(),
            name,
            role: Role::Student,
        }
    }
}

/// Proiezione di una sessione studente salvata in cache.
///
/// Il ruolo non viene memorizzato: lo riaggiunge chi legge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSession {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl CachedSession {
    pub fn into_identity(self) -> Identity {
        Identity::student(self.email, self.name)
    }
}

/// Utente associato a una sessione valida
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

/// Metadati della sessione
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Risultato di una lookup riuscita sul session store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user: SessionUser,
    pub session: SessionInfo,
}

impl SessionRecord {
    pub fn identity(&self) -> Identity {
        Identity::student(self.user.email.clone(), self.user.name.clone())
    }

    pub fn cache_entry(&self) -> CachedSession {
        CachedSession {
            email: self.user.email.clone(),
            name: self.user.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sponsor_serializes_without_name() {
        let value = serde_json::to_value(Identity::sponsor("sponsor@test.com")).unwrap();
        assert_eq!(value, json!({ "email": "sponsor@test.com", "role": "sponsor" }));
    }

    #[test]
    fn test_student_serializes_with_name() {
        let identity = Identity::student("s@test.com", Some("Test Student".to_string()));
        let value = serde_json::to_value(identity).unwrap();
        assert_eq!(
            value,
            json!({ "email": "s@test.com", "name": "Test Student", "role": "student" })
        );
    }

    #[test]
    fn test_cache_entry_excludes_role() {
        let record = SessionRecord {
            user: SessionUser {
                id: "1".to_string(),
                email: "student@test.com".to_string(),
                name: Some("Test Student".to_string()),
            },
            session: SessionInfo {
                id: "s1".to_string(),
                token: None,
            },
        };
        let encoded = serde_json::to_string(&record.cache_entry()).unwrap();
        assert_eq!(encoded, r#"{"email":"student@test.com","name":"Test Student"}"#);
    }

    #[test]
    fn test_cached_entry_without_name() {
        let cached: CachedSession = serde_json::from_str(r#"{"email":"a@b.c"}"#).unwrap();
        assert_eq!(cached.into_identity(), Identity::student("a@b.c", None));
    }
}
