use super::Claims;

/// Authenticated admin extracted from a verified JWT
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Admin id (from JWT sub claim)
    pub admin_id: String,

    /// Admin email if available
    pub email: Option<String>,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Result<Self, &'static str> {
        if claims.sub.trim().is_empty() {
            return Err("Token has an empty subject");
        }

        Ok(Self {
            admin_id: claims.sub.clone(),
            email: claims.email.clone(),
        })
    }
}
