use serde::Deserialize;
use vigil_core::Domain;

use crate::error::AppError;

/// Extractor para rutas /cache/{domain}/{resource}
#[derive(Debug, Deserialize)]
pub struct CollectionPath {
    pub domain: String,
    pub resource: String,
}

/// Extractor para rutas /cache/{domain}/{resource}/{id}
#[derive(Debug, Deserialize)]
pub struct DetailPath {
    pub domain: String,
    pub resource: String,
    pub id: String,
}

impl CollectionPath {
    /// Valida el dominio y que el recurso no este vacio.
    pub fn parse(&self) -> Result<(Domain, &str), AppError> {
        parse_target(&self.domain, &self.resource)
    }
}

impl DetailPath {
    pub fn parse(&self) -> Result<(Domain, &str, &str), AppError> {
        let (domain, resource) = parse_target(&self.domain, &self.resource)?;
        let id = self.id.trim();
        if id.is_empty() {
            return Err(AppError::BadRequest("Id cannot be empty".to_string()));
        }
        Ok((domain, resource, id))
    }
}

fn parse_target<'a>(domain: &str, resource: &'a str) -> Result<(Domain, &'a str), AppError> {
    let domain = domain.parse::<Domain>()?;
    let resource = resource.trim();
    if resource.is_empty() {
        return Err(AppError::BadRequest("Resource cannot be empty".to_string()));
    }
    Ok((domain, resource))
}
