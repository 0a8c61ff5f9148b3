//! Human-readable status messages.
//!
//! Delivery is fire-and-forget: a failed send is logged and dropped, and
//! never affects a governance decision that has already been committed.
//! Messages to individual collaborators are independent of each other and
//! are sent concurrently.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::task::JoinSet;
use tracing::warn;

use super::rules::RuleViolation;
use crate::adapters::{MessageSink, OutboundMessage};
use crate::domain::UserId;

/// Where review notices go
#[derive(Debug, Clone)]
pub struct ReviewChannel {
    pub channel_id: String,

    /// User group tagged on every review notice
    pub usergroup_id: String,
}

/// How a published workflow can be reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessLink {
    /// Link that starts the workflow
    Start(String),

    /// Link to the workflow's details
    Details(String),
}

impl AccessLink {
    pub fn url(&self) -> &str {
        match self {
            Self::Start(url) | Self::Details(url) => url,
        }
    }

    fn sentence(&self) -> String {
        match self {
            Self::Start(url) => format!("The link to start it is: {}", url),
            Self::Details(url) => format!("A shareable link to view the workflow details is: {}", url),
        }
    }
}

pub struct NotificationDispatcher {
    sink: Arc<dyn MessageSink>,
    review: ReviewChannel,
}

impl NotificationDispatcher {
    pub fn new(sink: Arc<dyn MessageSink>, review: ReviewChannel) -> Self {
        Self { sink, review }
    }

    /// Announce a flagged publish to reviewers, the requester and every demoted collaborator
    pub async fn workflow_flagged(
        &self,
        workflow_id: &str,
        title: &str,
        link: &str,
        actor: &str,
        violations: &[RuleViolation],
        demoted: &[UserId],
    ) {
        let review_notice = OutboundMessage::text(
            &self.review.channel_id,
            format!("<!subteam^{}>", self.review.usergroup_id),
        )
        .with_blocks(review_blocks(
            &self.review.usergroup_id,
            workflow_id,
            title,
            link,
            demoted,
            violations,
        ));
        self.deliver(review_notice).await;

        let rule_list = violations
            .iter()
            .map(|v| format!("• {}", v.name))
            .collect::<Vec<_>>()
            .join("\n");
        self.deliver(OutboundMessage::text(
            actor,
            format!(
                "Hey there! You just tried to publish *{}*.\n\nUnfortunately, it's been flagged for manual review. \
                 You've been removed as a workflow collaborator until the workflow has been reviewed.\n\n\
                 Your workflow was flagged because it failed to pass the following rulesets:\n{}",
                title, rule_list
            ),
        ))
        .await;

        let others = demoted
            .iter()
            .filter(|c| c.as_str() != actor)
            .map(|c| {
                OutboundMessage::text(
                    c,
                    format!(
                        "Hey there! <@{}> just tried to publish *{}*, which you're a collaborator on.\n\n\
                         Unfortunately, it's been flagged for manual review. You've been removed as a \
                         workflow collaborator until the workflow has been reviewed.",
                        actor, title
                    ),
                )
            })
            .collect();
        self.fan_out(others).await;
    }

    pub async fn workflow_published(
        &self,
        title: &str,
        actor: &str,
        link: &AccessLink,
        collaborators: &[UserId],
    ) {
        self.deliver(OutboundMessage::text(
            actor,
            format!("*{}* was published successfully!\n\n{}", title, link.sentence()),
        ))
        .await;

        let text = format!(
            "Hey there! <@{}> just published *{}*, which you're a collaborator on.\n\n{}",
            actor,
            title,
            link.sentence()
        );
        self.fan_out(direct(collaborators, &text)).await;
    }

    pub async fn workflow_unpublished(&self, title: &str, actor: &str, collaborators: &[UserId]) {
        self.deliver(OutboundMessage::text(
            actor,
            format!(
                "*{}* was unpublished successfully. It will no longer work until someone publishes it again.",
                title
            ),
        ))
        .await;

        let text = format!(
            "Hey there! <@{}> just unpublished *{}*, which you're a collaborator on. \
             It will no longer work until someone publishes it again.",
            actor, title
        );
        self.fan_out(direct(collaborators, &text)).await;
    }

    pub async fn workflow_deleted(&self, title: &str, actor: &str, collaborators: &[UserId]) {
        self.deliver(OutboundMessage::text(
            actor,
            format!(
                "*{}* was deleted successfully. It no longer exists, and cannot be published or edited.",
                title
            ),
        ))
        .await;

        let text = format!(
            "Hey there! <@{}> just deleted *{}*, which you were a collaborator on. \
             It no longer exists, and cannot be published or edited.",
            actor, title
        );
        self.fan_out(direct(collaborators, &text)).await;
    }

    /// Tell the demoted collaborators how their workflow's review ended
    pub async fn review_resolved(
        &self,
        title: &str,
        approved: bool,
        reason: Option<&str>,
        link: Option<&AccessLink>,
        collaborators: &[UserId],
    ) {
        let text = if approved {
            let mut text = format!(
                "Good news! *{}* was approved and published, and you've been re-added as a collaborator.",
                title
            );
            if let Some(link) = link {
                text.push_str("\n\n");
                text.push_str(&link.sentence());
            }
            text
        } else {
            let mut text = format!(
                "*{}* was not approved for publishing. You've been re-added as a collaborator so you can make changes.",
                title
            );
            if let Some(reason) = reason {
                text.push_str(&format!("\n\nReviewer's note: {}", reason));
            }
            text
        };

        self.fan_out(direct(collaborators, &text)).await;
    }

    pub async fn workflow_created(&self, title: &str, actor: &str, share_url: &str) {
        self.deliver(OutboundMessage::text(
            actor,
            format!("*<{}|{}>* was created! Open it in Workflow Builder to add steps.", share_url, title),
        ))
        .await;
    }

    async fn deliver(&self, message: OutboundMessage) {
        if let Err(e) = self.sink.post_message(&message).await {
            warn!(channel = %message.channel, error = %e, "Failed to deliver notification");
        }
    }

    async fn fan_out(&self, messages: Vec<OutboundMessage>) {
        let mut sends = JoinSet::new();
        for message in messages {
            let sink = Arc::clone(&self.sink);
            sends.spawn(async move {
                let result = sink.post_message(&message).await;
                (message.channel, result)
            });
        }

        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((channel, Err(e))) => {
                    warn!(%channel, error = %e, "Failed to deliver notification")
                }
                Err(e) => warn!(error = %e, "Notification task failed"),
            }
        }
    }
}

fn direct(users: &[UserId], text: &str) -> Vec<OutboundMessage> {
    users.iter().map(|u| OutboundMessage::text(u, text)).collect()
}

fn review_blocks(
    usergroup_id: &str,
    workflow_id: &str,
    title: &str,
    link: &str,
    demoted: &[UserId],
    violations: &[RuleViolation],
) -> Value {
    let mut authors: Vec<Value> = Vec::new();
    for (i, user) in demoted.iter().enumerate() {
        if i > 0 {
            authors.push(json!({ "type": "text", "text": ", " }));
        }
        authors.push(json!({ "type": "user", "user_id": user }));
    }

    let mut headline = vec![
        json!({ "type": "link", "text": title, "url": link, "style": { "bold": true } }),
        json!({ "type": "text", "text": " (by " }),
    ];
    headline.extend(authors);
    headline.push(json!({ "type": "text", "text": ") got flagged for manual review." }));

    let reasons: Vec<Value> = violations
        .iter()
        .map(|v| json!({ "type": "rich_text_section", "elements": [{ "type": "text", "text": v.name }] }))
        .collect();

    json!([
        {
            "type": "rich_text",
            "elements": [
                {
                    "type": "rich_text_section",
                    "elements": [{ "type": "usergroup", "usergroup_id": usergroup_id }]
                },
                { "type": "rich_text_quote", "border": 1, "elements": headline },
                {
                    "type": "rich_text_section",
                    "elements": [
                        { "type": "emoji", "name": "information_source", "unicode": "2139" },
                        { "type": "text", "text": " Why was this workflow flagged?", "style": { "bold": true } }
                    ]
                },
                { "type": "rich_text_list", "style": "bullet", "elements": reasons }
            ]
        },
        {
            "type": "actions",
            "elements": [
                {
                    "type": "button",
                    "action_id": "review-workflow",
                    "text": { "type": "plain_text", "text": "Review workflow" },
                    "value": workflow_id
                },
                {
                    "type": "button",
                    "action_id": "wrt-publish",
                    "text": { "type": "plain_text", "text": "Approve" },
                    "style": "primary",
                    "value": workflow_id
                },
                {
                    "type": "button",
                    "action_id": "wrt-deny",
                    "text": { "type": "plain_text", "text": "Deny" },
                    "style": "danger",
                    "value": workflow_id
                }
            ]
        }
    ])
}
