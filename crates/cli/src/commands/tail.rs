// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use spacelink::Client;

use super::{stream, updates};
use crate::cli::{GlobalArgs, TailArgs};
use crate::config;
use crate::error::Result;
use crate::output;

pub async fn run(global: &GlobalArgs, args: TailArgs) -> Result<()> {
    let client = Client::new(config::resolve(global)?)?;

    let (updates, rx) = updates();
    let errors = updates.clone();
    let subscription = client.pubsub().queue_subscribe(
        &args.subject,
        args.queue.as_deref().unwrap_or_default(),
        move |message| updates.line(output::pubsub_message(message)),
        move |err| errors.failed(err),
    );
    let subscription = match subscription {
        Ok(subscription) => subscription,
        Err(e) => {
            client.shutdown();
            return Err(e.into());
        }
    };

    let result = stream(rx, &mut std::io::stdout()).await;
    subscription.unsubscribe();
    client.shutdown();
    result
}
