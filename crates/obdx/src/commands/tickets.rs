//! Support ticket command handlers.

use tabled::Tabled;

use obdx_core::{
    Command as CoreCommand, CommandResult, NewTicket, RemoteStore, Scheduler, SupportTicket,
    TicketStatus,
};

use crate::cli::{GlobalOpts, TicketsArgs, TicketsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct TicketRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Opened")]
    opened: String,
}

impl From<&SupportTicket> for TicketRow {
    fn from(t: &SupportTicket) -> Self {
        Self {
            id: t.id.to_string(),
            from: format!("{} {}", t.first_name, t.last_name),
            subject: output::clip(&t.subject, 40),
            status: t.status.to_string(),
            opened: output::or_dash(t.created_at.map(output::timestamp)),
        }
    }
}

fn detail(t: &SupportTicket) -> String {
    [
        format!("ID:          {}", t.id),
        format!("Status:      {}", t.status),
        format!("From:        {} {} <{}>", t.first_name, t.last_name, t.email),
        format!("Phone:       {}", t.phone.as_deref().unwrap_or("-")),
        format!("Subject:     {}", t.subject),
        format!("Attachment:  {}", t.attachment_url.as_deref().unwrap_or("-")),
        String::new(),
        t.description.clone(),
    ]
    .join("\n")
}

fn print_ticket(ticket: &SupportTicket, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(&global.output, ticket, detail, |t| t.id.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn expect_ticket(result: CommandResult) -> Result<SupportTicket, CliError> {
    match result {
        CommandResult::Ticket(ticket) => Ok(ticket),
        other => Err(CliError::Internal(format!(
            "unexpected command result: {other:?}"
        ))),
    }
}

pub async fn handle(
    scheduler: &Scheduler<RemoteStore>,
    args: TicketsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        TicketsCommand::List { open } => {
            let tickets: Vec<SupportTicket> = scheduler
                .list_tickets()
                .await?
                .into_iter()
                .filter(|t| !open || t.status.is_open())
                .collect();
            let out = output::render_list(
                &global.output,
                &tickets,
                |t| TicketRow::from(t),
                |t| t.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TicketsCommand::Create {
            first_name,
            last_name,
            email,
            phone,
            subject,
            description,
            attachment_url,
        } => {
            let new = NewTicket {
                first_name,
                last_name,
                email,
                phone,
                subject,
                description,
                attachment_url,
            };
            let ticket = expect_ticket(scheduler.execute(CoreCommand::CreateTicket(new)).await?)?;
            print_ticket(&ticket, global)?;
            output::notice(global, "Ticket opened");
            Ok(())
        }

        TicketsCommand::Status { id, status } => {
            let status = TicketStatus::from(status);
            let ticket = expect_ticket(
                scheduler
                    .execute(CoreCommand::SetTicketStatus {
                        id: util::parse_id(&id)?,
                        status,
                    })
                    .await?,
            )?;
            print_ticket(&ticket, global)?;
            output::notice(global, &format!("Ticket marked {status}"));
            Ok(())
        }
    }
}
