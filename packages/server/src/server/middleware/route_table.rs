//! Static route classification for the session gate.
//!
//! The public list is closed: any path not named here is protected.

pub const ROOT_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
/// Where authenticated users land instead of the login screen
pub const LANDING_PATH: &str = "/dashboard";
/// Query parameter carrying the originally requested path to the login page
pub const FROM_PARAM: &str = "from";

const PUBLIC_PATHS: &[&str] = &[
    ROOT_PATH,
    LOGIN_PATH,
    "/forgot-password",
    "/reset-password",
    "/complete-registration",
];

const PUBLIC_PREFIXES: &[&str] = &["/api/public"];

const STATIC_PREFIXES: &[&str] = &["/_next/static", "/_next/image", "/static"];
const STATIC_FILES: &[&str] = &["/favicon.ico", "/robots.txt"];
const IMAGE_EXTENSIONS: &[&str] = &["svg", "png", "jpg", "jpeg", "gif", "webp", "ico"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Served without consulting the session at all
    StaticAsset,
    Public,
    Protected,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    public_paths: &'static [&'static str],
    public_prefixes: &'static [&'static str],
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            public_paths: PUBLIC_PATHS,
            public_prefixes: PUBLIC_PREFIXES,
        }
    }
}

impl RouteTable {
    pub fn classify(&self, path: &str) -> RouteClass {
        // Relative segments never match a public entry
        if path.split('/').any(|segment| segment == ".." || segment == ".") {
            return RouteClass::Protected;
        }

        if is_static_asset(path) {
            return RouteClass::StaticAsset;
        }

        let normalized = normalize(path);
        if self.public_paths.iter().any(|public| *public == normalized)
            || self
                .public_prefixes
                .iter()
                .any(|prefix| has_segment_prefix(normalized, prefix))
        {
            return RouteClass::Public;
        }

        RouteClass::Protected
    }
}

/// Drop one trailing slash so `/login/` matches `/login`
fn normalize(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

/// `/api/public` covers `/api/public/x` but not `/api/publicity`
fn has_segment_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn is_static_asset(path: &str) -> bool {
    if STATIC_FILES.iter().any(|file| *file == path) {
        return true;
    }
    if STATIC_PREFIXES
        .iter()
        .any(|prefix| has_segment_prefix(path, prefix))
    {
        return true;
    }
    path.rsplit_once('.')
        .map(|(_, ext)| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exact_paths() {
        let table = RouteTable::default();
        for path in [
            "/",
            "/login",
            "/login/",
            "/forgot-password",
            "/reset-password",
            "/complete-registration",
        ] {
            assert_eq!(table.classify(path), RouteClass::Public, "{path}");
        }
    }

    #[test]
    fn test_public_api_prefix() {
        let table = RouteTable::default();
        assert_eq!(table.classify("/api/public"), RouteClass::Public);
        assert_eq!(table.classify("/api/public/health"), RouteClass::Public);
        assert_eq!(table.classify("/api/publicity"), RouteClass::Protected);
        assert_eq!(table.classify("/api/permissions"), RouteClass::Protected);
    }

    #[test]
    fn test_everything_else_protected() {
        let table = RouteTable::default();
        for path in [
            "/dashboard",
            "/municipios",
            "/licitacoes/42",
            "/contratos",
            "/ordens-de-servico",
            "/login-help",
            "",
        ] {
            assert_eq!(table.classify(path), RouteClass::Protected, "{path}");
        }
    }

    #[test]
    fn test_relative_segments_protected() {
        let table = RouteTable::default();
        assert_eq!(table.classify("/api/public/../permissions"), RouteClass::Protected);
        assert_eq!(table.classify("/./login"), RouteClass::Protected);
    }

    #[test]
    fn test_static_assets() {
        let table = RouteTable::default();
        assert_eq!(table.classify("/favicon.ico"), RouteClass::StaticAsset);
        assert_eq!(table.classify("/_next/static/chunk.js"), RouteClass::StaticAsset);
        assert_eq!(table.classify("/images/brasao.PNG"), RouteClass::StaticAsset);
        assert_eq!(table.classify("/report.pdf"), RouteClass::Protected);
    }
}
