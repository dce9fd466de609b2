//! Handover CLI - submit, review and follow charge handovers from a terminal

mod client;
mod messages;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use client::HandoverClient;
use messages::{
    ApprovalKind, ApprovalRecord, Claims, CreateHandover, Decision, DecisionBody, FeedMessage,
    Handover,
};

#[derive(Parser)]
#[command(name = "handover-cli")]
#[command(about = "Command-line client for the charge handover service")]
#[command(version)]
struct Cli {
    /// Server URL
    #[arg(short, long, env = "HANDOVER_SERVER", default_value = "http://localhost:3000")]
    server: String,

    /// Bearer token of the acting user
    #[arg(short, long, env = "HANDOVER_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint a development token with the server's shared secret
    Token {
        #[arg(long, env = "HANDOVER_JWT_SECRET", hide_env_values = true)]
        secret: String,

        /// User id
        #[arg(long)]
        id: Uuid,

        #[arg(long)]
        employee_id: String,

        /// Role, e.g. hod, principal, teaching
        #[arg(long)]
        role: String,

        #[arg(long)]
        department: String,

        #[arg(long)]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,

        /// Lifetime in hours
        #[arg(long, default_value_t = 12)]
        hours: i64,
    },

    /// List sent and received handovers
    List,

    /// Submit a new handover
    Create {
        /// User id of the receiver
        #[arg(long)]
        receiver: Uuid,

        #[arg(long)]
        designation: String,

        /// Receiver's department
        #[arg(long)]
        department: String,

        #[arg(long)]
        reason: String,

        /// First day, YYYY-MM-DD
        #[arg(long)]
        from: NaiveDate,

        /// Last day, YYYY-MM-DD
        #[arg(long)]
        to: NaiveDate,

        /// Document handed over (repeatable)
        #[arg(long = "document")]
        documents: Vec<String>,

        /// Asset handed over (repeatable)
        #[arg(long = "asset")]
        assets: Vec<String>,

        /// Pending task (repeatable)
        #[arg(long = "task")]
        pending_tasks: Vec<String>,

        #[arg(long)]
        remarks: Option<String>,
    },

    /// Decide the head-of-department stage
    ApproveHod {
        id: Uuid,

        /// Reject instead of approve
        #[arg(long)]
        reject: bool,

        #[arg(long)]
        remarks: Option<String>,
    },

    /// Accept or decline as the receiver
    ApproveFaculty {
        id: Uuid,

        /// Reject instead of approve
        #[arg(long)]
        reject: bool,

        #[arg(long)]
        remarks: Option<String>,
    },

    /// Follow handover events live
    Watch {
        /// Exit after the first handover event
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "handover_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Token {
            secret,
            id,
            employee_id,
            role,
            department,
            first_name,
            last_name,
            hours,
        } => {
            let now = Utc::now().timestamp();
            let claims = Claims {
                sub: id,
                employee_id,
                role,
                department,
                first_name,
                last_name,
                exp: now + hours * 3600,
                iat: now,
            };
            println!("{}", client::mint_token(&secret, &claims)?);
            Ok(())
        }
        Commands::List => run_list(&connect(&cli.server, cli.token)?).await,
        Commands::Create {
            receiver,
            designation,
            department,
            reason,
            from,
            to,
            documents,
            assets,
            pending_tasks,
            remarks,
        } => {
            let payload = CreateHandover {
                receiver_id: receiver,
                receiver_designation: designation,
                receiver_department: department,
                reason,
                handover_start_date: from,
                handover_end_date: to,
                documents,
                assets,
                pending_tasks,
                remarks,
            };
            let handover = connect(&cli.server, cli.token)?.create(&payload).await?;
            println!("Created handover {}", handover.id);
            print_handover(&handover);
            Ok(())
        }
        Commands::ApproveHod {
            id,
            reject,
            remarks,
        } => {
            let client = connect(&cli.server, cli.token)?;
            run_decide(&client, id, "approve-hod", reject, remarks).await
        }
        Commands::ApproveFaculty {
            id,
            reject,
            remarks,
        } => {
            let client = connect(&cli.server, cli.token)?;
            run_decide(&client, id, "approve-faculty", reject, remarks).await
        }
        Commands::Watch { once } => run_watch(&connect(&cli.server, cli.token)?, once).await,
    }
}

fn connect(server: &str, token: Option<String>) -> Result<HandoverClient> {
    let token = token.ok_or_else(|| anyhow::anyhow!("--token or HANDOVER_TOKEN is required"))?;
    HandoverClient::new(server, token)
}

fn print_handover(handover: &Handover) {
    println!(
        "  {} [{}] {} -> {}, {} ({} to {})",
        handover.id,
        handover.status.label(),
        handover.department,
        handover.receiver.name,
        handover.receiver.designation,
        handover.handover_start_date,
        handover.handover_end_date,
    );
    println!("      reason: {}", handover.reason);
    if let Some(remarks) = &handover.remarks {
        println!("      remarks: {}", remarks);
    }

    for (label, items) in [
        ("documents", &handover.documents),
        ("assets", &handover.assets),
        ("pending tasks", &handover.pending_tasks),
    ] {
        if !items.is_empty() {
            println!("      {}: {}", label, items.join(", "));
        }
    }

    for (stage, approval) in [
        ("HOD", &handover.hod_approval),
        ("receiver", &handover.faculty_approval),
    ] {
        if let Some(approval) = approval {
            print_approval(stage, approval);
        }
    }
}

fn print_approval(stage: &str, approval: &ApprovalRecord) {
    let by = match (approval.kind, approval.approver_id.as_deref()) {
        (ApprovalKind::AutoBypass, _) => "automatically".to_string(),
        (ApprovalKind::Human, Some(approver)) => format!("by {}", approver),
        (ApprovalKind::Human, None) => "by an unknown approver".to_string(),
    };
    println!(
        "      {} {:?} {} on {}",
        stage,
        approval.decision,
        by,
        approval.date.format("%Y-%m-%d %H:%M")
    );
    if let Some(remarks) = &approval.remarks {
        println!("        {}", remarks);
    }
}

async fn run_list(client: &HandoverClient) -> Result<()> {
    let view = client.list().await?;

    println!("Sent:");
    if view.sent.is_empty() {
        println!("  (none)");
    }
    for handover in &view.sent {
        print_handover(handover);
    }

    println!("Received:");
    if view.received.is_empty() {
        println!("  (none)");
    }
    for item in &view.received {
        print_handover(&item.handover);
        if item.actionable {
            println!("      awaiting your decision");
        }
    }

    Ok(())
}

async fn run_decide(
    client: &HandoverClient,
    id: Uuid,
    action: &str,
    reject: bool,
    remarks: Option<String>,
) -> Result<()> {
    let decision = if reject {
        Decision::Rejected
    } else {
        Decision::Approved
    };

    let handover = client
        .decide(id, action, &DecisionBody { decision, remarks })
        .await?;
    println!("Recorded decision");
    print_handover(&handover);
    Ok(())
}

async fn run_watch(client: &HandoverClient, once: bool) -> Result<()> {
    client
        .watch(|event| match event {
            FeedMessage::Connected { identity_id } => {
                println!("Watching handovers as {}", identity_id);
                true
            }
            FeedMessage::HandoverCreated { handover } => {
                println!("New handover:");
                print_handover(&handover);
                !once
            }
            FeedMessage::HandoverDecided {
                stage,
                decision,
                handover,
            } => {
                println!("{} stage {:?}:", stage, decision);
                print_handover(&handover);
                !once
            }
            FeedMessage::Lagged { missed } => {
                println!("Missed {} events; run `list` to catch up", missed);
                true
            }
        })
        .await
}
