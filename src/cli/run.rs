//! Handler for `flowrun run`.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use super::RunArgs;
use crate::client::WorkflowClient;
use crate::config::FlowConfig;
use crate::types::{InitiateRun, RunOutcome, SubmitReply};

/// Run a workflow, reading each reply from stdin while it is suspended.
pub async fn handle_run(
    config: FlowConfig,
    args: RunArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match args.timeout_secs {
        Some(secs) => config.with_timeout(Duration::from_secs(secs)),
        None => config,
    };
    let client = WorkflowClient::from_config(&config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let request = InitiateRun::builder()
        .workflow_kind(args.kind)
        .subject_id(args.subject.clone())
        .parameters(args.params.into_iter().collect())
        .cancel(cancel.clone())
        .build();
    let mut outcome = client.initiate_run(request).await?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match outcome {
            RunOutcome::Completed { text, .. } => {
                println!("{text}");
                return Ok(());
            }
            RunOutcome::Suspended {
                continuation_token,
                prompt_text,
                ..
            } => {
                println!("{prompt_text}");
                eprint!("> ");
                let Some(reply) = stdin.next_line().await? else {
                    client.abandon(&args.subject);
                    return Ok(());
                };

                let reply = SubmitReply::builder()
                    .subject_id(args.subject.clone())
                    .continuation_token(continuation_token)
                    .reply_text(reply)
                    .cancel(cancel.clone())
                    .build();
                outcome = client.submit_reply(reply).await?;
            }
        }
    }
}
