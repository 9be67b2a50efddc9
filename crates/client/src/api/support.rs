//! Support ticket endpoints.

use crate::session::ApiClient;
use crate::transport::ApiRequest;
use gymdesk_core::error::{GymError, GymResult};
use gymdesk_core::{NewTicket, Ticket, TicketStatus};
use serde::Serialize;

#[derive(Serialize)]
struct ReplyRequest<'a> {
    message: &'a str,
}

#[derive(Serialize)]
struct StatusRequest {
    status: TicketStatus,
}

impl ApiClient {
    pub async fn list_tickets(&self, status: Option<TicketStatus>) -> GymResult<Vec<Ticket>> {
        let mut request = ApiRequest::get("/support/tickets");
        if let Some(status) = status {
            request = request.query("status", status.as_str());
        }
        self.send_data(request).await
    }

    pub async fn get_ticket(&self, id: &str) -> GymResult<Ticket> {
        self.get_data(&format!("/support/tickets/{id}")).await
    }

    pub async fn create_ticket(&self, ticket: &NewTicket) -> GymResult<Ticket> {
        ticket.validate()?;
        let created: Ticket = self.post_data("/support/tickets", ticket).await?;
        tracing::info!(ticket_id = %created.id, "ticket created");
        Ok(created)
    }

    /// Posts a message and returns the updated thread.
    pub async fn reply(&self, ticket_id: &str, message: &str) -> GymResult<Ticket> {
        if message.trim().is_empty() {
            return Err(GymError::Validation("Message is required".into()));
        }
        self.post_data(
            &format!("/support/tickets/{ticket_id}/messages"),
            &ReplyRequest { message },
        )
        .await
    }

    /// Moves `ticket` to `next`, refusing transitions the lifecycle forbids.
    pub async fn update_status(&self, ticket: &Ticket, next: TicketStatus) -> GymResult<Ticket> {
        if !ticket.status.can_transition_to(next) {
            return Err(GymError::Validation(format!(
                "Cannot move ticket from {} to {}",
                ticket.status.as_str(),
                next.as_str()
            )));
        }
        let request = ApiRequest::patch(format!("/support/tickets/{}/status", ticket.id))
            .json(&StatusRequest { status: next })?;
        self.send_data(request).await
    }
}
