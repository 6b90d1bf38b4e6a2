// Abuse-risk class of a proxied path. Login and registration endpoints get
// a much smaller budget than ordinary API traffic, since credential
// guessing is cheap to attempt and expensive to absorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Auth,
    General,
}

impl RouteClass {
    // Pure classification over the validated path
    pub fn classify(path: &str) -> Self {
        if path.contains("auth/login") || path.contains("auth/register") {
            RouteClass::Auth
        } else {
            RouteClass::General
        }
    }

    // Prefix for the rate-limit key, e.g. "auth:203.0.113.9"
    pub fn key_prefix(self) -> &'static str {
        match self {
            RouteClass::Auth => "auth",
            RouteClass::General => "general",
        }
    }
}
