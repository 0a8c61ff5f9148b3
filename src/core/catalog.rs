//! Known trigger kinds and built-in step functions.
//!
//! Anything not in these tables is treated as custom and gets a workflow
//! flagged for review.

use std::collections::HashSet;
use std::sync::OnceLock;

use crate::domain::TriggerKind;

/// "From a link in Slack"
pub const LINK_TRIGGER: &str = "Ftt0101";
/// "On a schedule"
pub const SCHEDULE_TRIGGER: &str = "Ftt0104";
/// "When a list item is updated"
pub const LIST_ITEM_UPDATED_TRIGGER: &str = "Ftt0106";
/// "From a webhook"
pub const WEBHOOK_TRIGGER: &str = "Ftt0107";
/// "When a message is posted"
pub const MESSAGE_POSTED_TRIGGER: &str = "Ftt010L";

/// Send a message to a channel
pub const SEND_MESSAGE_STEP: &str = "Fn0102";
/// Update a list record
pub const UPDATE_LIST_RECORD_STEP: &str = "Fn013E";
/// Branching (switch) step
pub const SWITCH_STEP: &str = "Fn0201";

/// Trigger type ids with their builder labels
pub const TRIGGER_TYPES: &[(&str, &str)] = &[
    (LINK_TRIGGER, "From a link in Slack"),
    (SCHEDULE_TRIGGER, "On a schedule"),
    ("Ftt0102", "When an emoji reaction is used"),
    ("Ftt0103", "When a person joins a channel"),
    (LIST_ITEM_UPDATED_TRIGGER, "When a list item is updated"),
    (WEBHOOK_TRIGGER, "From a webhook"),
    ("Ftt010A", "When the app is mentioned"),
    ("Ftt010B", "When the channel is archived"),
    ("Ftt010C", "When a channel is deleted"),
    ("Ftt010D", "When a channel is renamed"),
    ("Ftt010E", "When a channel is shared"),
    ("Ftt010F", "When a channel is unarchived"),
    ("Ftt010G", "When a channel is unshared"),
    ("Ftt010H", "When a person changes their DND setting"),
    ("Ftt010J", "When a custom emoji is added or changed"),
    ("Ftt0109", "When a List item is created"),
    ("Ftt010K", "When message metadata is posted"),
    (MESSAGE_POSTED_TRIGGER, "When a message is posted"),
    ("Ftt010M", "When a pin is added to a channel"),
    ("Ftt010N", "When a pin is removed from a channel"),
    ("Ftt010P", "When an emoji reaction is removed from a message"),
    ("Ftt010Q", "When a shared channel invitation is accepted"),
    ("Ftt010R", "When a shared channel invitation is approved"),
    ("Ftt010S", "When a shared channel invitation is declined"),
    ("Ftt010T", "When a shared channel invitation is received"),
    ("Ftt010X", "When a shared channel invitation is requested"),
    ("Ftt010V", "When a person joins a workspace"),
    ("Ftt010U", "When a person leaves a channel"),
    ("Ftt07B1DKC6MU", "When a project is created in a workspace"),
    ("Ftt074FRVTHLM", "When a task in a workspace has an assignee update"),
    ("Ftt0757GZ8MME", "When a task in a workspace is completed"),
    ("Ftt074C4H60MC", "When a task in a workspace is updated"),
    ("Ftt072MCFDJR2", "When a task is added to a workspace"),
    ("Ftt07FTAATW8P", "When a project to-do in a group is completed"),
    ("Ftt07A23J8CBF", "When a project to-do is added"),
    ("Ftt07GLGS01FT", "When a project to-do is added to a group"),
    ("Ftt079QDMNG7R", "When a project to-do is completed"),
    ("Ftt079ZL4Q9T4", "When a pull request is merged in a repository (Bitbucket)"),
    ("Ftt079T1HMQ0N", "When a pull request is opened in a repository (Bitbucket)"),
    ("Ftt07ACAALLEM", "When an issue is created in a repository (Bitbucket)"),
    ("Ftt079PK56AFN", "When a task in a team's space changes status"),
    ("Ftt079J7XQJA1", "When a task is added to a team's space"),
    ("Ftt077EGX7YJK", "When a pull request is merged in a repository (GitHub)"),
    ("Ftt077V3Z01U2", "When a pull request is opened in a repository (GitHub)"),
    ("Ftt077V0NRM43", "When an issue is closed in a repository (GitHub)"),
    ("Ftt0787PJQWSV", "When an issue is created in a repository (GitHub)"),
    ("Ftt077MRAMYLE", "When a pull request is merged in a repository (GitHub Enterprise Server)"),
    ("Ftt078H8CJBG8", "When a pull request is opened in a repository (GitHub Enterprise Server)"),
    ("Ftt077UEFPU1G", "When an issue is closed in a repository (GitHub Enterprise Server)"),
    ("Ftt077UB5KXL3", "When an issue is created in a repository (GitHub Enterprise Server)"),
    ("Ftt07GABFJVV2", "When a project in a team changes target date"),
    ("Ftt07G17VPH4N", "When an issue in a team changes status"),
    ("Ftt079YDBDT5L", "When an issue is added in a team"),
    ("Ftt07DZQN5VHC", "When a board item has an update"),
    ("Ftt07EV7MJTK2", "When an item is added to a board"),
    ("Ftt070Z8P6MBQ", "When an incident is created"),
    ("Ftt0715T9DQCA", "When an incident is created for a team"),
    ("Ftt072BDA4CE5", "When an incident is resolved"),
    ("Ftt071S4MAJBY", "When an incident is resolved for a team"),
    ("Ftt07AA2QDAFN", "When a task in a folder changes status"),
    ("Ftt07ATPTA6HW", "When a task is created in a folder"),
];

/// Built-in step function ids with their names
pub const STEP_FUNCTIONS: &[(&str, &str)] = &[
    (SEND_MESSAGE_STEP, "send_message"),
    ("Fn0105", "update_channel_topic"),
    ("Fn0106", "create_channel"),
    ("Fn0107", "invite_user_to_channel"),
    ("Fn0108", "delay"),
    ("Fn0109", "archive_channel"),
    ("Fn010A", "create_usergroup"),
    ("Fn010B", "add_user_to_usergroup"),
    ("Fn010E", "add_pin"),
    ("Fn010F", "send_ephemeral_message"),
    ("Fn010H", "remove_user_from_usergroup"),
    ("Fn010M", "send_dm"),
    ("Fn010N", "open_form"),
    ("Fn010P", "reply_in_thread"),
    ("Fn010S", "add_reaction"),
    ("Fn010T", "remove_reaction"),
    ("Fn0131", "share_list_users"),
    ("Fn0133", "list_add_record"),
    ("Fn013B", "read_list_record"),
    ("Fn013C", "copy_list"),
    (UPDATE_LIST_RECORD_STEP, "update_list_record"),
    ("Fn013F", "delete_list_record"),
    ("Fn013G", "lists_activity_feed"),
    ("Fn013H", "send_task_list_alert"),
    ("Fn014E", "create_items_due_summary"),
    ("Fn010W", "add_bookmark"),
    ("Fn011G", "canvas_create"),
    ("Fn011L", "canvas_copy"),
    ("Fn011X", "share_canvas"),
    ("Fn011Y", "share_canvas_in_thread"),
    ("Fn0127", "canvas_update_content_v2"),
    ("Fn0128", "add_canvas_to_channel_tab"),
    ("Fn015X", "summarize_channel"),
    ("Fn0164", "add_agent_to_channel"),
    (SWITCH_STEP, "switch_step"),
];

/// Membership sets over the known trigger and step ids
#[derive(Debug, Clone)]
pub struct Catalog {
    triggers: HashSet<&'static str>,
    steps: HashSet<&'static str>,
}

impl Catalog {
    /// The catalog of the platform's built-ins, built once per process
    pub fn builtin() -> &'static Catalog {
        static CATALOG: OnceLock<Catalog> = OnceLock::new();
        CATALOG.get_or_init(|| Catalog {
            triggers: TRIGGER_TYPES.iter().map(|(id, _)| *id).collect(),
            steps: STEP_FUNCTIONS.iter().map(|(id, _)| *id).collect(),
        })
    }

    pub fn is_known_trigger(&self, id: &str) -> bool {
        self.triggers.contains(id)
    }

    pub fn is_known_step(&self, id: &str) -> bool {
        self.steps.contains(id)
    }

    /// Rebinding kind implied by a trigger type id. Every known id that is
    /// not a link, schedule or webhook trigger is an event trigger.
    pub fn trigger_kind(&self, id: &str) -> Option<TriggerKind> {
        match id {
            LINK_TRIGGER => Some(TriggerKind::Shortcut),
            SCHEDULE_TRIGGER => Some(TriggerKind::Schedule),
            WEBHOOK_TRIGGER => Some(TriggerKind::Webhook),
            _ if self.is_known_trigger(id) => Some(TriggerKind::Event),
            _ => None,
        }
    }

    /// Builder label for a trigger type id
    pub fn trigger_label(&self, id: &str) -> Option<&'static str> {
        TRIGGER_TYPES
            .iter()
            .find(|(known, _)| *known == id)
            .map(|(_, label)| *label)
    }
}
