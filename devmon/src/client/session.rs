//! Authentication state of the management API session

use reqwest::header::{HeaderMap, SET_COOKIE};

/// Cookie names accepted as the session token. The second one is a misspelling
/// some API releases actually send.
pub const SESSION_COOKIE_NAMES: &[&str] = &["Authorization", "Autorization"];

/// Opaque session token issued on login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

impl SessionCookie {
    /// Value for a `Cookie` request header
    pub fn header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Unauthenticated,
    Authenticated {
        cookie: SessionCookie,
        /// Bumped on every login, lets concurrent callers tell whether someone
        /// else already re-authenticated.
        generation: u64,
    },
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }

    pub fn cookie(&self) -> Option<&SessionCookie> {
        match self {
            Session::Authenticated { cookie, .. } => Some(cookie),
            Session::Unauthenticated => None,
        }
    }

    pub fn generation(&self) -> Option<u64> {
        match self {
            Session::Authenticated { generation, .. } => Some(*generation),
            Session::Unauthenticated => None,
        }
    }

    /// Transition to authenticated with a freshly issued cookie.
    pub fn login(&mut self, cookie: SessionCookie, generation: u64) {
        *self = Session::Authenticated { cookie, generation };
    }

    /// Transition to unauthenticated, after a 401 or an explicit logout.
    pub fn invalidate(&mut self) {
        *self = Session::Unauthenticated;
    }
}

/// Find the session cookie among the `Set-Cookie` headers of a login response.
pub fn find_session_cookie(headers: &HeaderMap) -> Option<SessionCookie> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(parse_set_cookie)
        .find(|cookie| {
            SESSION_COOKIE_NAMES
                .iter()
                .any(|name| cookie.name.eq_ignore_ascii_case(name))
        })
}

fn parse_set_cookie(header: &str) -> Option<SessionCookie> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(SessionCookie {
        name: name.to_string(),
        value: value.trim().trim_matches('"').to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(values: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for value in values {
            map.append(SET_COOKIE, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_session_transitions() {
        let mut session = Session::default();
        assert!(!session.is_authenticated());
        assert_eq!(session.generation(), None);

        let cookie = SessionCookie { name: "Authorization".into(), value: "abc".into() };
        session.login(cookie.clone(), 1);
        assert!(session.is_authenticated());
        assert_eq!(session.cookie(), Some(&cookie));
        assert_eq!(session.generation(), Some(1));

        session.invalidate();
        assert!(!session.is_authenticated());
        assert_eq!(session.cookie(), None);
    }

    #[test]
    fn test_find_session_cookie_accepts_both_spellings() {
        let canonical = find_session_cookie(&headers(&[
            "lang=en; Path=/",
            "Authorization=tok-1; Path=/; HttpOnly",
        ]))
        .unwrap();
        assert_eq!(canonical.header_value(), "Authorization=tok-1");

        let misspelled = find_session_cookie(&headers(&["autorization=tok-2; Secure"])).unwrap();
        assert_eq!(misspelled.name, "autorization");
        assert_eq!(misspelled.value, "tok-2");
    }

    #[test]
    fn test_find_session_cookie_missing() {
        assert!(find_session_cookie(&headers(&["lang=en"])).is_none());
        assert!(find_session_cookie(&HeaderMap::new()).is_none());
    }
}
