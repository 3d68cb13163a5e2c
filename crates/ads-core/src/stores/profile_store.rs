use std::sync::Arc;

use ads_domain::Administrator;
use tracing::info;

use crate::backend::{ImageData, ProfileUpdate};
use crate::session::ApiClient;
use crate::signature::{check_removal, prepare_upload};
use crate::{CoreError, CoreResult};

/// Signed-in administrator's profile and signature.
pub struct ProfileStore {
    api: Arc<ApiClient>,
}

impl ProfileStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Cached profile from the session.
    pub fn profile(&self) -> Option<Administrator> {
        self.api.current_user()
    }

    pub fn refresh(&self) -> CoreResult<Administrator> {
        let user = self.api.call(|backend, ctx| backend.current_user(ctx))?;
        self.api.update_cached_user(user.clone())?;
        Ok(user)
    }

    /// Sends only the provided fields. The email is never part of an update.
    pub fn update(&self, update: ProfileUpdate) -> CoreResult<Administrator> {
        let update = trimmed(update);
        let user = self
            .api
            .call(|backend, ctx| backend.update_profile(ctx, &update))?;
        info!(user = %user.email, "profile updated");
        self.api.update_cached_user(user.clone())?;
        Ok(user)
    }

    pub fn upload_signature(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        password: &str,
    ) -> CoreResult<Administrator> {
        let image = prepare_upload(file_name, bytes, password)?;
        let user = self
            .api
            .call(|backend, ctx| backend.upload_signature(ctx, &image, password))?;
        info!(bytes = image.bytes.len(), "signature uploaded");
        self.api.update_cached_user(user.clone())?;
        Ok(user)
    }

    pub fn delete_signature(&self, password: &str) -> CoreResult<Administrator> {
        let current = self.profile().ok_or(CoreError::Unauthorized)?;
        check_removal(&current, password)?;
        let user = self
            .api
            .call(|backend, ctx| backend.delete_signature(ctx, password))?;
        info!("signature removed");
        self.api.update_cached_user(user.clone())?;
        Ok(user)
    }

    pub fn signature_image(&self) -> CoreResult<Option<ImageData>> {
        self.api.call(|backend, ctx| backend.signature_image(ctx))
    }
}

fn trimmed(update: ProfileUpdate) -> ProfileUpdate {
    let clean = |value: Option<String>| value.map(|text| text.trim().to_string());
    ProfileUpdate {
        first_name: clean(update.first_name).filter(|text| !text.is_empty()),
        last_name: clean(update.last_name).filter(|text| !text.is_empty()),
        phone: clean(update.phone),
        fiscal_code: clean(update.fiscal_code).map(|code| code.to_uppercase()),
        qualification: clean(update.qualification),
        court: clean(update.court),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{signed_in_client, TEST_EMAIL, TEST_PASSWORD};

    fn png() -> Vec<u8> {
        vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n', 0, 0]
    }

    #[test]
    fn update_keeps_email_and_refreshes_cache() {
        let (_backend, api) = signed_in_client();
        let store = ProfileStore::new(Arc::new(api));
        let user = store
            .update(ProfileUpdate {
                court: Some(" Tribunale di Torino ".into()),
                first_name: Some("   ".into()),
                ..ProfileUpdate::default()
            })
            .unwrap();
        assert_eq!(user.court.as_deref(), Some("Tribunale di Torino"));
        assert_eq!(user.first_name, "Laura");
        assert_eq!(user.email, TEST_EMAIL);
        assert_eq!(store.profile().unwrap().court, user.court);
    }

    #[test]
    fn signature_upload_and_removal() {
        let (backend, api) = signed_in_client();
        let store = ProfileStore::new(Arc::new(api));
        assert!(store.delete_signature(TEST_PASSWORD).is_err());

        let user = store.upload_signature("firma.png", png(), TEST_PASSWORD).unwrap();
        assert!(user.has_signature());
        assert!(store.profile().unwrap().has_signature());
        assert_eq!(store.signature_image().unwrap().map(|i| i.mime_type).as_deref(), Some("image/png"));

        assert!(matches!(
            store.delete_signature("wrong"),
            Err(CoreError::Api { status: 403, .. })
        ));
        let user = store.delete_signature(TEST_PASSWORD).unwrap();
        assert!(!user.has_signature());
        assert_eq!(backend.call_count("delete_signature"), 2);
    }

    #[test]
    fn invalid_files_never_reach_the_backend() {
        let (backend, api) = signed_in_client();
        let store = ProfileStore::new(Arc::new(api));
        assert!(store.upload_signature("firma.bmp", png(), TEST_PASSWORD).is_err());
        assert_eq!(backend.call_count("upload_signature"), 0);
    }
}
