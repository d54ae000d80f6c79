//! Response dispatch: transcript in, reply text out.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::context::CallContext;
use super::msg::{Feed, Reply, Transcript};
use super::session::CallStats;
use crate::services::ResponseGenerator;

pub struct RespondStage {
    rx: mpsc::Receiver<Feed<Transcript>>,
    tx: mpsc::Sender<Feed<Reply>>,
    agent: Arc<dyn ResponseGenerator>,
    ctx: Arc<CallContext>,
    stats: Arc<CallStats>,
    fallback_reply: String,
}

impl RespondStage {
    pub fn new(
        rx: mpsc::Receiver<Feed<Transcript>>,
        tx: mpsc::Sender<Feed<Reply>>,
        agent: Arc<dyn ResponseGenerator>,
        ctx: Arc<CallContext>,
        stats: Arc<CallStats>,
        fallback_reply: String,
    ) -> Self {
        Self {
            rx,
            tx,
            agent,
            ctx,
            stats,
            fallback_reply,
        }
    }

    pub async fn run(mut self) {
        debug!("respond stage started");
        loop {
            let msg = tokio::select! {
                _ = self.ctx.cancelled() => break,
                msg = self.rx.recv() => msg,
            };
            let text = match msg {
                Some(Feed::Item(Transcript::Text(text))) if !text.trim().is_empty() => text,
                Some(Feed::Item(_)) => {
                    debug!("no actionable transcript, skipping turn");
                    continue;
                }
                Some(Feed::Stop) | None => break,
            };

            let result = tokio::select! {
                _ = self.ctx.cancelled() => break,
                r = self.agent.respond(&text) => r,
            };

            // The caller must never be met with silence because generation
            // failed: substitute the fixed fallback line.
            let reply = match result {
                Ok(reply) if !reply.trim().is_empty() => reply,
                Ok(_) => {
                    warn!("generator returned an empty reply, using fallback");
                    self.fallback_reply.clone()
                }
                Err(e) => {
                    warn!("response generation failed, using fallback: {e}");
                    self.fallback_reply.clone()
                }
            };

            info!(%reply, "reply ready");
            self.stats.record_reply();
            if self.tx.try_send(Feed::Item(Reply(reply))).is_err() {
                warn!("synthesis queue full, dropping reply");
            }
        }
        debug!("respond stage stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct FixedAgent(Option<String>);

    #[async_trait]
    impl ResponseGenerator for FixedAgent {
        async fn respond(&self, _transcript: &str) -> anyhow::Result<String> {
            self.0.clone().ok_or_else(|| anyhow!("generator offline"))
        }
    }

    async fn run_one(agent: FixedAgent, input: Transcript) -> Option<Reply> {
        let (in_tx, in_rx) = mpsc::channel(4);
        let (out_tx, mut out_rx) = mpsc::channel(4);
        let ctx = Arc::new(CallContext::new());
        let stats = Arc::new(CallStats::default());
        let worker = tokio::spawn(
            RespondStage::new(in_rx, out_tx, Arc::new(agent), ctx, stats, "sorry, say again?".to_string())
                .run(),
        );

        in_tx.send(Feed::Item(input)).await.unwrap();
        in_tx.send(Feed::Stop).await.unwrap();
        worker.await.unwrap();

        match out_rx.try_recv() {
            Ok(Feed::Item(reply)) => Some(reply),
            _ => None,
        }
    }

    #[tokio::test]
    async fn empty_transcript_yields_no_reply() {
        let out = run_one(FixedAgent(Some("hi".to_string())), Transcript::Empty).await;
        assert!(out.is_none(), "empty marker is discarded, no API call made");
    }

    #[tokio::test]
    async fn blank_transcript_yields_no_reply() {
        let out = run_one(
            FixedAgent(Some("hi".to_string())),
            Transcript::Text("   ".to_string()),
        )
        .await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn success_forwards_generated_reply() {
        let out = run_one(
            FixedAgent(Some("Hello! How can I help?".to_string())),
            Transcript::Text("hello".to_string()),
        )
        .await;
        assert_eq!(out, Some(Reply("Hello! How can I help?".to_string())));
    }

    #[tokio::test]
    async fn failure_substitutes_fallback() {
        let out = run_one(FixedAgent(None), Transcript::Text("hello".to_string())).await;
        assert_eq!(out, Some(Reply("sorry, say again?".to_string())));
    }

    #[tokio::test]
    async fn empty_generation_substitutes_fallback() {
        let out = run_one(
            FixedAgent(Some("  ".to_string())),
            Transcript::Text("hello".to_string()),
        )
        .await;
        assert_eq!(out, Some(Reply("sorry, say again?".to_string())));
    }
}
