//! HR endpoints.

use crate::session::ApiClient;
use gymdesk_core::error::GymResult;
use gymdesk_core::LeaveRequest;

impl ApiClient {
    pub async fn list_leaves(&self) -> GymResult<Vec<LeaveRequest>> {
        self.get_data("/hr/leaves").await
    }
}
