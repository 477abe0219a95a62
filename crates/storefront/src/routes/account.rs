//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::SavedAddress;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{PageContext, auth::RequireAuth, set_current_user};
use crate::services::auth::authorized;
use crate::state::AppState;

/// User display data for templates.
#[derive(Clone, Debug)]
pub struct UserView {
    pub email: String,
    pub name: String,
    pub company_name: Option<String>,
}

/// Address display data for templates.
#[derive(Clone, Debug)]
pub struct AddressView {
    pub label: String,
    pub text: String,
    pub is_default: bool,
}

impl From<&SavedAddress> for AddressView {
    fn from(address: &SavedAddress) -> Self {
        Self {
            label: address
                .address_type
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "Address".to_string()),
            text: address.one_line(),
            is_default: address.is_default,
        }
    }
}

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub page: PageContext,
    pub user: UserView,
    pub addresses: Vec<AddressView>,
    /// Saved addresses could not be loaded.
    pub addresses_unavailable: bool,
}

/// Display account overview: profile and saved addresses.
///
/// The profile is re-read from the backend so name changes made elsewhere
/// show up here and in the navigation bar.
#[instrument(skip(state, session, page, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireAuth(mut user): RequireAuth,
) -> Result<impl IntoResponse, AppError> {
    let backend = state.backend();

    let profile = authorized(&session, &mut user, |mut tokens| async move {
        let result = backend.get_me(&mut tokens).await;
        (tokens, result)
    })
    .await?;

    if profile.first_name != user.first_name
        || profile.last_name != user.last_name
        || profile.company_name != user.company_name
    {
        user.first_name.clone_from(&profile.first_name);
        user.last_name.clone_from(&profile.last_name);
        user.company_name.clone_from(&profile.company_name);
        set_current_user(&session, &user).await?;
    }

    let addresses = authorized(&session, &mut user, |mut tokens| async move {
        let result = backend.my_addresses(&mut tokens).await;
        (tokens, result)
    })
    .await;

    let (addresses, addresses_unavailable) = match addresses {
        Ok(addresses) => (addresses.iter().map(AddressView::from).collect(), false),
        Err(AppError::Backend(e)) => {
            tracing::warn!(error = %e, "Could not load saved addresses");
            (Vec::new(), true)
        }
        Err(e) => return Err(e),
    };

    Ok(AccountIndexTemplate {
        page,
        user: UserView {
            email: profile.email.clone(),
            name: profile.full_name(),
            company_name: profile.company_name,
        },
        addresses,
        addresses_unavailable,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_address_view() {
        let address: SavedAddress = serde_json::from_value(serde_json::json!({
            "id": 4,
            "address_line1": "12 MG Road",
            "address_line2": "",
            "city": "Pune",
            "state": "Maharashtra",
            "pincode": "411001",
            "address_type": null,
            "is_default": true
        }))
        .unwrap();

        let view = AddressView::from(&address);
        assert_eq!(view.label, "Address");
        assert_eq!(view.text, "12 MG Road, Pune, Maharashtra, 411001");
        assert!(view.is_default);
    }
}
