//! The injected reply control and the factory that builds it

use crate::config::ControlConfig;
use crate::dom::parse_selector;
use crate::error::AssistResult;
use scraper::Selector;
use uuid::Uuid;

/// Builds controls that borrow the host's native button styling
#[derive(Debug, Clone)]
pub struct ControlFactory {
    config: ControlConfig,
}

impl ControlFactory {
    pub fn new(config: ControlConfig) -> Self {
        Self { config }
    }

    /// Fresh, unmarked control in its idle presentation
    pub fn create_control(&self) -> InjectedControl {
        InjectedControl {
            id: Uuid::new_v4(),
            classes: self.config.classes.clone(),
            marker_class: self.config.marker_class.clone(),
            marked: false,
            style: self.config.style.clone(),
            tooltip: self.config.tooltip.clone(),
            idle_label: self.config.label.clone(),
            working_label: self.config.working_label.clone(),
            label: self.config.label.clone(),
            disabled: false,
        }
    }

    /// Selector matching any control this factory has marked
    pub fn marker_selector(&self) -> AssistResult<Selector> {
        parse_selector(&format!(".{}", self.config.marker_class))
    }

    pub fn marker_class(&self) -> &str {
        &self.config.marker_class
    }
}

/// Presentation state of one control instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedControl {
    id: Uuid,
    classes: String,
    marker_class: String,
    marked: bool,
    style: String,
    tooltip: String,
    idle_label: String,
    working_label: String,
    label: String,
    disabled: bool,
}

impl InjectedControl {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Attach the identifying marker class
    pub fn mark(&mut self) {
        self.marked = true;
    }

    /// Switch to the in-progress presentation
    pub fn show_working(&mut self) {
        self.label = self.working_label.clone();
        self.disabled = true;
    }

    /// Back to the idle presentation
    pub fn show_idle(&mut self) {
        self.label = self.idle_label.clone();
        self.disabled = false;
    }

    /// Markup for the control's current state
    pub fn markup(&self) -> String {
        let mut class = self.classes.clone();
        if self.marked {
            if !class.is_empty() {
                class.push(' ');
            }
            class.push_str(&self.marker_class);
        }

        let mut markup = format!(
            r#"<div class="{}" role="button" data-tooltip="{}" data-control-id="{}" style="{}""#,
            escape(&class),
            escape(&self.tooltip),
            self.id,
            escape(&self.style),
        );
        if self.disabled {
            markup.push_str(r#" aria-disabled="true" disabled="""#);
        }
        markup.push('>');
        markup.push_str(&escape(&self.label));
        markup.push_str("</div>");
        markup
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
