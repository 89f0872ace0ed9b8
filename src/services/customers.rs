use crate::{
    db::DbPool,
    entities::customer::{ActiveModel as CustomerActiveModel, Model as CustomerModel},
    errors::{unique_violation, ServiceError},
    repositories::{CustomerFilter, CustomerRepository},
};
use sea_orm::{DbErr, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
    /// CPF or CNPJ, punctuation allowed
    #[validate(custom = "validate_document")]
    pub document: String,
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
    #[validate(length(max = 20, message = "Phone cannot exceed 20 characters"))]
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

/// Partial update. Document and e-mail are re-normalized and must stay unique.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    #[validate(custom = "validate_document")]
    pub document: Option<String>,
    #[validate(email(message = "Email must be a valid address"))]
    pub email: Option<String>,
    #[validate(length(max = 20, message = "Phone cannot exceed 20 characters"))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

/// Validates a Brazilian CPF (11 digits) or CNPJ (14 digits), check digits included.
pub fn validate_document(value: &str) -> Result<(), ValidationError> {
    let digits = normalize_document(value).ok_or_else(|| invalid_document(value))?;

    let valid = match digits.len() {
        11 => cpf_is_valid(&digits),
        14 => cnpj_is_valid(&digits),
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(invalid_document(value))
    }
}

/// Strips `.`, `-`, `/` and spaces. None when anything else but digits remains.
pub fn normalize_document(value: &str) -> Option<String> {
    let mut digits = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '0'..='9' => digits.push(c),
            '.' | '-' | '/' | ' ' => {}
            _ => return None,
        }
    }
    Some(digits)
}

fn invalid_document(value: &str) -> ValidationError {
    let mut err = ValidationError::new("document");
    err.message = Some(format!("Document '{}' is not a valid CPF or CNPJ", value).into());
    err
}

fn to_digits(digits: &str) -> Vec<u32> {
    digits.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_same(d: &[u32]) -> bool {
    d.iter().all(|&x| x == d[0])
}

fn cpf_is_valid(digits: &str) -> bool {
    let d = to_digits(digits);
    if d.len() != 11 || all_same(&d) {
        return false;
    }

    [9usize, 10].iter().all(|&n| {
        let sum: u32 = (0..n).map(|i| d[i] * (n as u32 + 1 - i as u32)).sum();
        let check = (sum * 10) % 11 % 10;
        check == d[n]
    })
}

fn cnpj_is_valid(digits: &str) -> bool {
    const WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

    let d = to_digits(digits);
    if d.len() != 14 || all_same(&d) {
        return false;
    }

    [12usize, 13].iter().all(|&n| {
        let weights = &WEIGHTS[13 - n..];
        let sum: u32 = (0..n).map(|i| d[i] * weights[i]).sum();
        let rem = sum % 11;
        let check = if rem < 2 { 0 } else { 11 - rem };
        check == d[n]
    })
}

/// Customer directory management
#[derive(Clone)]
pub struct CustomerService {
    repository: CustomerRepository,
}

impl CustomerService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            repository: CustomerRepository::new(db_pool),
        }
    }

    /// Registers a customer. Document and e-mail must be unused.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<CustomerModel, ServiceError> {
        request.validate()?;

        let document = normalize_document(&request.document).ok_or_else(|| {
            ServiceError::ValidationError(format!("Invalid document: {}", request.document))
        })?;

        let customer = CustomerActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            document: Set(document),
            email: Set(request.email.trim().to_lowercase()),
            phone: Set(request.phone),
            address: Set(request.address),
            is_active: Set(true),
            deleted_at: Set(None),
            ..Default::default()
        };

        let created = self
            .repository
            .create(customer)
            .await
            .map_err(duplicate_as_conflict)?;

        info!(customer_id = %created.id, "Customer created");
        Ok(created)
    }

    /// Applies the given fields to a live customer.
    #[instrument(skip(self, request))]
    pub async fn update_customer(
        &self,
        id: Uuid,
        request: UpdateCustomerRequest,
    ) -> Result<CustomerModel, ServiceError> {
        request.validate()?;

        let existing = self.get_customer(id).await?;
        let mut active = existing.into_active_model();

        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(document) = request.document {
            let digits = normalize_document(&document).ok_or_else(|| {
                ServiceError::ValidationError(format!("Invalid document: {}", document))
            })?;
            active.document = Set(digits);
        }
        if let Some(email) = request.email {
            active.email = Set(email.trim().to_lowercase());
        }
        if let Some(phone) = request.phone {
            active.phone = Set(phone);
        }
        if let Some(address) = request.address {
            active.address = Set(address);
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }

        let updated = self
            .repository
            .update(active)
            .await
            .map_err(duplicate_as_conflict)?;

        info!(customer_id = %id, "Customer updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn get_customer(&self, id: Uuid) -> Result<CustomerModel, ServiceError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list_customers(
        &self,
        filter: CustomerFilter,
    ) -> Result<Vec<CustomerModel>, ServiceError> {
        let filter = CustomerFilter {
            document: filter
                .document
                .map(|d| normalize_document(&d).unwrap_or(d)),
            ..filter
        };
        Ok(self.repository.list(&filter).await?)
    }

    /// Soft-deletes a customer; existing orders keep referencing it.
    #[instrument(skip(self))]
    pub async fn delete_customer(&self, id: Uuid) -> Result<(), ServiceError> {
        if !self.repository.soft_delete(id).await? {
            return Err(ServiceError::NotFound(format!("Customer {} not found", id)));
        }
        info!(customer_id = %id, "Customer soft deleted");
        Ok(())
    }

    /// Customer lookup used by the seed tool to stay idempotent.
    pub async fn find_by_document(&self, document: &str) -> Result<Option<CustomerModel>, ServiceError> {
        let normalized = normalize_document(document).unwrap_or_else(|| document.to_string());
        Ok(self.repository.find_by_document(&normalized).await?)
    }
}

fn duplicate_as_conflict(e: DbErr) -> ServiceError {
    match unique_violation(&e) {
        Some(msg) if msg.contains("document") => {
            warn!("Duplicate customer document");
            ServiceError::Conflict("A customer with this document already exists".into())
        }
        Some(_) => {
            warn!("Duplicate customer email");
            ServiceError::Conflict("A customer with this email already exists".into())
        }
        None => ServiceError::DatabaseError(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("52998224725", true ; "plain cpf")]
    #[test_case("529.982.247-25", true ; "punctuated cpf")]
    #[test_case("65998838009", true ; "another cpf")]
    #[test_case("52998224724", false ; "wrong cpf check digit")]
    #[test_case("11111111111", false ; "repeated cpf digits")]
    #[test_case("11222333000181", true ; "plain cnpj")]
    #[test_case("11.222.333/0001-81", true ; "punctuated cnpj")]
    #[test_case("11222333000180", false ; "wrong cnpj check digit")]
    #[test_case("00000000000000", false ; "repeated cnpj digits")]
    #[test_case("1234567", false ; "wrong length")]
    #[test_case("5299822472a", false ; "letters")]
    #[test_case("", false ; "empty")]
    fn document_validation(document: &str, valid: bool) {
        assert_eq!(validate_document(document).is_ok(), valid);
    }

    #[test]
    fn normalization_strips_punctuation_only() {
        assert_eq!(
            normalize_document("11.222.333/0001-81").as_deref(),
            Some("11222333000181")
        );
        assert_eq!(normalize_document("123x"), None);
    }

    #[test]
    fn request_validation_checks_email_and_document() {
        let mut request = CreateCustomerRequest {
            name: "Maria Souza".into(),
            document: "52998224725".into(),
            email: "maria@example.com".into(),
            phone: "11999990000".into(),
            address: "Rua A, 1".into(),
        };
        assert!(request.validate().is_ok());

        request.email = "not-an-email".into();
        assert!(request.validate().is_err());

        request.email = "maria@example.com".into();
        request.document = "12345".into();
        assert!(request.validate().is_err());
    }

    #[test]
    fn update_validation_skips_absent_fields() {
        assert!(UpdateCustomerRequest::default().validate().is_ok());

        let bad_document = UpdateCustomerRequest {
            document: Some("52998224724".into()),
            ..Default::default()
        };
        assert!(bad_document.validate().is_err());

        let bad_email = UpdateCustomerRequest {
            email: Some("nope".into()),
            ..Default::default()
        };
        assert!(bad_email.validate().is_err());
    }
}
