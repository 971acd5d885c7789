//! OAuth service
//! Implicit-grant URL construction and redirect parsing

use url::Url;

use crate::core::models::OAuthConfig;
use crate::error::{AppError, AppResult};

fn endpoint(config: &OAuthConfig, path: &str, params: &[(&str, &str)]) -> AppResult<Url> {
    let base = format!("https://{}{}", config.idp_host, path);
    Ok(Url::parse_with_params(&base, params)?)
}

/// Authorization URL the web view is pointed at to log in
pub fn login_url(config: &OAuthConfig) -> AppResult<Url> {
    endpoint(
        config,
        &config.login_path,
        &[
            ("response_type", "token"),
            ("client_id", &config.client_id),
            ("redirect_uri", &config.redirect_uri),
        ],
    )
}

/// Logout URL; the provider bounces back to the same redirect URI
pub fn logout_url(config: &OAuthConfig) -> AppResult<Url> {
    endpoint(
        config,
        &config.logout_path,
        &[
            ("response_type", "token"),
            ("client_id", &config.client_id),
            ("logout_uri", &config.redirect_uri),
        ],
    )
}

/// Host navigations are intercepted on
pub fn redirect_host(config: &OAuthConfig) -> AppResult<String> {
    let url = Url::parse(&config.redirect_uri)?;
    url.host_str()
        .map(str::to_string)
        .ok_or_else(|| AppError::Config(format!("redirect uri has no host: {}", config.redirect_uri)))
}

/// Pull `id_token` out of an `a=1&b=2` fragment.
///
/// Pieces that do not split into exactly two parts on `=` are skipped; the first
/// well-formed `id_token` pair wins.
pub fn token_from_fragment(fragment: &str) -> Option<String> {
    fragment.split('&').find_map(|piece| {
        let pair: Vec<&str> = piece.split('=').collect();
        match pair.as_slice() {
            ["id_token", value] => Some((*value).to_string()),
            _ => None,
        }
    })
}

/// Token carried in a redirect URL's fragment, if any
pub fn token_from_redirect(url: &Url) -> Option<String> {
    url.fragment().and_then(token_from_fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OAuthConfig {
        OAuthConfig {
            client_id: "ABC".to_string(),
            redirect_uri: "https://x/".to_string(),
            idp_host: "idp.example.com".to_string(),
            ..OAuthConfig::default()
        }
    }

    #[test]
    fn login_url_is_form_encoded() {
        let url = login_url(&config()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://idp.example.com/login?response_type=token&client_id=ABC&redirect_uri=https%3A%2F%2Fx%2F"
        );
    }

    #[test]
    fn logout_url_uses_logout_uri_param() {
        let url = logout_url(&config()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://idp.example.com/logout?response_type=token&client_id=ABC&logout_uri=https%3A%2F%2Fx%2F"
        );
    }

    #[test]
    fn redirect_host_comes_from_redirect_uri() {
        assert_eq!(redirect_host(&config()).unwrap(), "x");
        assert_eq!(
            redirect_host(&OAuthConfig::default()).unwrap(),
            "www.23andme.com"
        );

        let bad = OAuthConfig {
            redirect_uri: "not a url".to_string(),
            ..config()
        };
        assert!(redirect_host(&bad).is_err());
    }

    #[test]
    fn extracts_id_token() {
        assert_eq!(
            token_from_fragment("access_token=a&id_token=XYZ&expires_in=3600").as_deref(),
            Some("XYZ")
        );
        assert_eq!(token_from_fragment("id_token=only").as_deref(), Some("only"));
    }

    #[test]
    fn first_match_wins() {
        assert_eq!(
            token_from_fragment("id_token=first&id_token=second").as_deref(),
            Some("first")
        );
    }

    #[test]
    fn missing_or_malformed_yields_nothing() {
        assert_eq!(token_from_fragment(""), None);
        assert_eq!(token_from_fragment("access_token=a&expires_in=1"), None);
        assert_eq!(token_from_fragment("id_token"), None);
        assert_eq!(token_from_fragment("id_token=a=b"), None);
        assert_eq!(token_from_fragment("ID_TOKEN=a"), None);
    }

    #[test]
    fn malformed_piece_does_not_hide_later_token() {
        assert_eq!(
            token_from_fragment("junk&id_token=a=b&id_token=ok").as_deref(),
            Some("ok")
        );
    }

    #[test]
    fn token_from_redirect_reads_fragment() {
        let url = Url::parse("https://x/#id_token=T&token_type=Bearer").unwrap();
        assert_eq!(token_from_redirect(&url).as_deref(), Some("T"));

        let no_fragment = Url::parse("https://x/?id_token=T").unwrap();
        assert_eq!(token_from_redirect(&no_fragment), None);
    }
}
