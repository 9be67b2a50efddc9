//! QR access control endpoints.

use crate::session::ApiClient;
use crate::transport::ApiRequest;
use gymdesk_core::error::GymResult;
use gymdesk_core::{MemberDetails, RosterSnapshot, ScanResponse};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ScanRequest<'a> {
    qr_token: &'a str,
    kiosk_id: &'a str,
}

impl ApiClient {
    /// Submits one scan. Kiosk-credential rejections do not end the session.
    pub async fn scan(&self, token: &str, kiosk_id: &str) -> GymResult<ScanResponse> {
        let request = ApiRequest::post("/access/scan")
            .json(&ScanRequest {
                qr_token: token,
                kiosk_id,
            })?
            .skip_auth_redirect();
        self.send_data(request).await
    }

    /// Members currently allowed in, for offline verification.
    pub async fn offline_roster(&self) -> GymResult<RosterSnapshot> {
        let members: Vec<MemberDetails> = self.get_data("/access/offline-roster").await?;
        Ok(RosterSnapshot::from_members(members))
    }
}
