use std::collections::VecDeque;

use crate::dom::{Dom, NodeId, truncate_chars};
use crate::events::{EventState, Listener, ListenerKind, ListenerStore};
use crate::guard::{BeforeUnloadOutcome, GuardState};
use crate::html::parse_html;
use crate::options::Options;
use crate::selector::parse_selector_groups;
use crate::timers::{PendingTimer, ScheduledTask, TimerId, TimerQueue, TimerTask};
use crate::tracker::SafeEdits;
use crate::value::{ControlValue, read_value};
use crate::{
    ATTR_BLOCK, ATTR_BYPASS, ATTR_CONTAINER, ATTR_MEMBER, DEFAULT_TRACKED_EVENT,
    DEFAULT_TRACKED_TAGS, DEFAULT_TRIGGER_EVENT, DEFAULT_TRIGGER_TAGS, DIRTY_EVENT, Error, Result,
};

/// One `safe_edits:dirty` event as seen by the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyNotification {
    pub dirty: bool,
    pub at_ms: i64,
}

/// A page with dirty tracking: DOM, event listeners, virtual clock and the
/// [`SafeEdits`] tracker that watches registered controls.
pub struct Page {
    dom: Dom,
    listeners: ListenerStore,
    timers: TimerQueue,
    tracker: SafeEdits,
    options: Options,
    notifications: Vec<DirtyNotification>,
    trace_logs: VecDeque<String>,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        Self::from_html_with_options(html, Options::default())
    }

    pub fn from_html_with_options(html: &str, options: Options) -> Result<Self> {
        options.validate()?;
        let dom = parse_html(html)?;
        let mut listeners = ListenerStore::default();
        listeners.add(
            dom.root,
            DIRTY_EVENT,
            Listener::bubble(ListenerKind::RecordDirty),
        );
        Ok(Self {
            dom,
            listeners,
            timers: TimerQueue::default(),
            tracker: SafeEdits::default(),
            options,
            notifications: Vec::new(),
            trace_logs: VecDeque::new(),
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn tracker(&self) -> &SafeEdits {
        &self.tracker
    }


    /// Tracks `input` and `select` elements in (and including) the element
    /// with id `container_id`, re-checking them on `input`.
    pub fn register(&mut self, container_id: &str) -> Result<usize> {
        self.register_with(container_id, DEFAULT_TRACKED_TAGS, DEFAULT_TRACKED_EVENT)
    }

    /// Tracks every element matching `tag_names` (comma-separated) in the
    /// container, capturing each one's current value as its original.
    pub fn register_with(
        &mut self,
        container_id: &str,
        tag_names: &str,
        event_type: &str,
    ) -> Result<usize> {
        let targets = self.registration_targets(container_id, tag_names)?;
        for node in &targets {
            let original = read_value(&self.dom, *node);
            self.setup_input_listener(*node, event_type, original);
        }
        self.trace_tracker_line(format!(
            "[safe_edits] register container=#{container_id} tags={tag_names} event={event_type} elements={}",
            targets.len()
        ));
        self.trigger_dirty_update();
        Ok(targets.len())
    }

    pub fn register_bypass(&mut self, container_id: &str) -> Result<usize> {
        self.register_bypass_with(container_id, DEFAULT_TRIGGER_TAGS, DEFAULT_TRIGGER_EVENT)
    }

    pub fn register_bypass_with(
        &mut self,
        container_id: &str,
        tag_names: &str,
        event_type: &str,
    ) -> Result<usize> {
        let targets = self.registration_targets(container_id, tag_names)?;
        for node in &targets {
            self.setup_bypass_listener(*node, event_type);
        }
        self.trace_tracker_line(format!(
            "[safe_edits] register_bypass container=#{container_id} tags={tag_names} event={event_type} elements={}",
            targets.len()
        ));
        self.trigger_dirty_update();
        Ok(targets.len())
    }

    pub fn register_reset(&mut self, container_id: &str) -> Result<usize> {
        self.register_reset_with(container_id, DEFAULT_TRIGGER_TAGS, DEFAULT_TRIGGER_EVENT)
    }

    /// Wires reset triggers scoped to their nearest
    /// `[data-safe-edits-container=true]` ancestor. A bare attribute parses
    /// as `"true"`.
    pub fn register_reset_with(
        &mut self,
        container_id: &str,
        tag_names: &str,
        event_type: &str,
    ) -> Result<usize> {
        let targets = self.registration_targets(container_id, tag_names)?;
        let container_selector = format!("[{ATTR_CONTAINER}=true]");
        for node in &targets {
            self.setup_reset_listener(*node, event_type, &container_selector)?;
        }
        self.trace_tracker_line(format!(
            "[safe_edits] register_reset container=#{container_id} tags={tag_names} event={event_type} elements={}",
            targets.len()
        ));
        self.trigger_dirty_update();
        Ok(targets.len())
    }

    fn registration_targets(&self, container_id: &str, tag_names: &str) -> Result<Vec<NodeId>> {
        let container = self
            .dom
            .by_id(container_id)
            .ok_or_else(|| Error::ContainerNotFound(container_id.to_string()))?;
        parse_selector_groups(tag_names)?;

        let mut targets = Vec::new();
        for node in self.dom.subtree_elements(container) {
            if self.dom.matches_selector(node, tag_names)? {
                targets.push(node);
            }
        }
        Ok(targets)
    }

    /// Makes `node` a member with `original` as its baseline and re-checks it
    /// on every `event_type`. Repeat calls keep the first baseline and never
    /// stack listeners.
    pub fn setup_input_listener(&mut self, node: NodeId, event_type: &str, original: ControlValue) {
        if self.tracker.add_member(node, original) {
            self.dom.toggle_flag_attr(node, ATTR_MEMBER, true);
        }
        self.listeners
            .add(node, event_type, Listener::bubble(ListenerKind::TrackValue));
    }

    pub fn setup_bypass_listener(&mut self, node: NodeId, event_type: &str) {
        self.listeners
            .add(node, event_type, Listener::bubble(ListenerKind::Bypass));
    }

    pub fn setup_reset_listener(
        &mut self,
        node: NodeId,
        event_type: &str,
        container_selector: &str,
    ) -> Result<()> {
        parse_selector_groups(container_selector)?;
        self.listeners.add(
            node,
            event_type,
            Listener::bubble(ListenerKind::Reset {
                container_selector: container_selector.to_string(),
            }),
        );
        Ok(())
    }


    pub fn is_dirty(&self) -> bool {
        self.tracker.is_dirty(&self.dom)
    }

    /// Connected members in document order.
    pub fn members(&self) -> Vec<NodeId> {
        self.tracker.live_members(&self.dom)
    }

    /// Recomputes the dirty state and dispatches `safe_edits:dirty` on the
    /// document with it. The document's own listener records the payload in
    /// the notification log.
    pub fn trigger_dirty_update(&mut self) -> bool {
        let dirty = self.is_dirty();
        let root = self.dom.root;
        self.trace_tracker_line(format!("[safe_edits] dirty={dirty}"));
        self.dispatch_event_with_detail(root, DIRTY_EVENT, Some(dirty));
        dirty
    }

    /// `true` snapshots the current members as the saved state; `false`
    /// drops the snapshot.
    pub fn freeze(&mut self, on: bool) {
        self.tracker.freeze(&self.dom, on);
        let size = self.tracker.is_frozen().map(<[NodeId]>::len);
        self.trace_tracker_line(format!("[safe_edits] freeze on={on} members={size:?}"));
        self.trigger_dirty_update();
    }

    pub fn is_frozen(&self) -> Option<&[NodeId]> {
        self.tracker.is_frozen()
    }

    /// Sets or clears the document-wide bypass. Unlike bypass triggers, a
    /// manual bypass does not expire.
    pub fn bypass(&mut self, on: bool) {
        let body = self.dom.body();
        let stale = if on {
            self.tracker.arm_bypass(body, None)
        } else {
            self.tracker.disarm_bypass(body).and_then(|marker| marker.expiry)
        };
        if let Some(timer) = stale {
            self.cancel_timer(timer);
        }
        self.dom.toggle_flag_attr(body, ATTR_BYPASS, on);
        self.trace_tracker_line(format!("[safe_edits] bypass document on={on}"));
        self.trigger_dirty_update();
    }

    pub fn take_dirty_notifications(&mut self) -> Vec<DirtyNotification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn dirty_notifications(&self) -> &[DirtyNotification] {
        &self.notifications
    }

    fn refresh_block(&mut self, node: NodeId) {
        let current = read_value(&self.dom, node);
        let Some(blocked) = self
            .tracker
            .record(node)
            .map(|record| record.original != current)
        else {
            return;
        };
        self.tracker.set_blocked(node, blocked);
        self.dom.toggle_flag_attr(node, ATTR_BLOCK, blocked);
        let label = self.trace_node_label(node);
        self.trace_tracker_line(format!(
            "[safe_edits] check {label} value={current} blocked={blocked}"
        ));
        self.trigger_dirty_update();
    }

    fn arm_expiring_bypass(&mut self, node: NodeId) {
        let (timer, due_at) = self.timers.schedule_timeout(
            TimerTask::ExpireBypass { node },
            self.options.bypass_expiry_ms,
        );
        self.trace_timer_line(format!(
            "[timer] schedule timeout id={timer} due_at={due_at} delay_ms={}",
            self.options.bypass_expiry_ms
        ));
        if let Some(stale) = self.tracker.arm_bypass(node, Some(timer)) {
            self.cancel_timer(stale);
        }
        self.dom.toggle_flag_attr(node, ATTR_BYPASS, true);
        let label = self.trace_node_label(node);
        self.trace_tracker_line(format!("[safe_edits] bypass {label} until={due_at}"));
        self.trigger_dirty_update();
    }

    fn reset_within(&mut self, node: NodeId, container_selector: &str) {
        // The selector was validated when the listener was set up.
        let scope = self
            .dom
            .closest(node, container_selector)
            .ok()
            .flatten()
            .unwrap_or(self.dom.root);
        let cleared = self.tracker.clear_blocks_within(&self.dom, scope);
        for member in &cleared {
            self.dom.toggle_flag_attr(*member, ATTR_BLOCK, false);
        }
        let label = self.trace_node_label(scope);
        self.trace_tracker_line(format!(
            "[safe_edits] reset scope={label} cleared={}",
            cleared.len()
        ));
        self.trigger_dirty_update();
    }


    pub fn activate(&mut self) {
        if self.tracker.guard.activate() {
            let root = self.dom.root;
            self.listeners.add(
                root,
                "beforeunload",
                Listener::bubble(ListenerKind::NavigationGuard),
            );
            self.trace_tracker_line("[safe_edits] guard active".into());
        }
    }

    pub fn deactivate(&mut self) {
        if self.tracker.guard.deactivate() {
            let root = self.dom.root;
            self.listeners.remove(
                root,
                "beforeunload",
                &Listener::bubble(ListenerKind::NavigationGuard),
            );
            self.trace_tracker_line("[safe_edits] guard inactive".into());
        }
    }

    pub fn guard_state(&self) -> GuardState {
        self.tracker.guard.state()
    }

    /// Fires `beforeunload` as a navigation away from the page would.
    pub fn request_unload(&mut self) -> BeforeUnloadOutcome {
        let root = self.dom.root;
        let event = self.dispatch_event(root, "beforeunload");
        BeforeUnloadOutcome::from(&event)
    }


    pub fn node(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    /// Replaces the value of an `<input>` or `<textarea>` and fires `input`.
    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let target = self.node(selector)?;
        if self.dom.disabled(target) || self.dom.readonly(target) {
            return Ok(());
        }
        let tag = self
            .dom
            .tag_name(target)
            .unwrap_or_default()
            .to_ascii_lowercase();
        if tag != "input" && tag != "textarea" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: tag,
            });
        }

        self.dom.set_value(target, text)?;
        self.dispatch_event(target, "input");
        Ok(())
    }

    pub fn set_checked(&mut self, selector: &str, checked: bool) -> Result<()> {
        let target = self.node(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }
        let kind = self.dom.input_type(target);
        if !matches!(kind.as_deref(), Some("checkbox" | "radio")) {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input[type=checkbox|radio]".into(),
                actual: self.describe_element(target),
            });
        }

        if self.dom.checked(target) != checked {
            if kind.as_deref() == Some("radio") && checked {
                self.dom.uncheck_other_radios_in_group(target)?;
            }
            self.dom.set_checked(target, checked)?;
            self.dispatch_event(target, "input");
            self.dispatch_event(target, "change");
        }
        Ok(())
    }

    /// Picks the option whose value is `value` and fires `input` and
    /// `change`.
    pub fn select_option(&mut self, selector: &str, value: &str) -> Result<()> {
        let target = self.node(selector)?;
        if !self.dom.has_tag(target, "select") {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "select".into(),
                actual: self.describe_element(target),
            });
        }
        if self.dom.disabled(target) {
            return Ok(());
        }
        if !self.dom.has_option_value(target, value) {
            return Err(Error::InvalidArgument(format!(
                "{selector} has no option with value {value:?}"
            )));
        }

        self.dom.set_value(target, value)?;
        self.dispatch_event(target, "input");
        self.dispatch_event(target, "change");
        Ok(())
    }

    /// Fires `click` and, unless prevented, runs the default action of
    /// checkboxes, radios and reset buttons.
    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.node(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }

        let click = self.dispatch_event(target, "click");
        if click.default_prevented {
            return Ok(());
        }

        if self.dom.is_checkbox_input(target) {
            let current = self.dom.checked(target);
            self.dom.set_checked(target, !current)?;
            self.dispatch_event(target, "input");
            self.dispatch_event(target, "change");
        } else if self.dom.is_radio_input(target) {
            if !self.dom.checked(target) {
                self.dom.uncheck_other_radios_in_group(target)?;
                self.dom.set_checked(target, true)?;
                self.dispatch_event(target, "input");
                self.dispatch_event(target, "change");
            }
        } else if self.dom.is_reset_control(target) {
            if let Some(form) = self.dom.form_owner(target) {
                let reset = self.dispatch_event(form, "reset");
                if !reset.default_prevented {
                    self.dom.reset_form_controls(form)?;
                }
            }
        }
        Ok(())
    }

    pub fn dispatch(&mut self, selector: &str, event: &str) -> Result<()> {
        let target = self.node(selector)?;
        self.dispatch_event(target, event);
        Ok(())
    }

    /// Host listener that calls `preventDefault` on `event`.
    pub fn prevent_default_on(&mut self, selector: &str, event: &str) -> Result<()> {
        let target = self.node(selector)?;
        self.listeners
            .add(target, event, Listener::bubble(ListenerKind::PreventDefault));
        Ok(())
    }

    /// Host listener that stops `event` from propagating past the target.
    pub fn stop_propagation_on(&mut self, selector: &str, event: &str) -> Result<()> {
        let target = self.node(selector)?;
        self.listeners
            .add(target, event, Listener::bubble(ListenerKind::StopPropagation));
        Ok(())
    }

    /// Parses `html` and appends its nodes to the element matching
    /// `parent_selector`. Returns the inserted top-level elements.
    pub fn append_html(&mut self, parent_selector: &str, html: &str) -> Result<Vec<NodeId>> {
        let parent = self.node(parent_selector)?;
        let fragment = parse_html(html)?;
        self.dom.adopt_fragment(parent, &fragment)
    }

    /// Appends an existing (possibly detached) node under `parent_selector`.
    pub fn append_node(&mut self, parent_selector: &str, node: NodeId) -> Result<()> {
        let parent = self.node(parent_selector)?;
        self.dom.append_child(parent, node)
    }

    /// Detaches the matching element and returns it.
    pub fn remove(&mut self, selector: &str) -> Result<NodeId> {
        let target = self.node(selector)?;
        self.dom.remove_node(target)?;
        Ok(target)
    }

    pub fn set_attribute(&mut self, selector: &str, name: &str, value: &str) -> Result<()> {
        let target = self.node(selector)?;
        self.dom.set_attr(target, name, value)
    }

    pub fn remove_attribute(&mut self, selector: &str, name: &str) -> Result<()> {
        let target = self.node(selector)?;
        self.dom.remove_attr(target, name)
    }

    pub fn value(&self, selector: &str) -> Result<String> {
        Ok(self.dom.value(self.node(selector)?))
    }

    pub fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        Ok(self.dom.attr(self.node(selector)?, name))
    }

    pub fn listener_count(&self, selector: &str, event: &str) -> Result<usize> {
        Ok(self.listeners.count(self.node(selector)?, event))
    }


    fn dispatch_event(&mut self, target: NodeId, event_type: &str) -> EventState {
        self.dispatch_event_with_detail(target, event_type, None)
    }

    fn dispatch_event_with_detail(
        &mut self,
        target: NodeId,
        event_type: &str,
        detail: Option<bool>,
    ) -> EventState {
        let mut event = EventState::new(event_type, target);
        event.detail = detail;

        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.dom.parent(node);
        }
        path.reverse();
        let ancestors = path.len().saturating_sub(1);

        // Capture phase.
        for node in &path[..ancestors] {
            event.current_target = *node;
            self.invoke_listeners(*node, &mut event, true);
            if event.propagation_stopped {
                self.trace_event_done(&event, "propagation_stopped");
                return event;
            }
        }

        // Target phase: capture listeners first.
        event.current_target = target;
        self.invoke_listeners(target, &mut event, true);
        if !event.propagation_stopped {
            self.invoke_listeners(target, &mut event, false);
        }
        if event.propagation_stopped {
            self.trace_event_done(&event, "propagation_stopped");
            return event;
        }

        // Bubble phase.
        for node in path[..ancestors].iter().rev() {
            event.current_target = *node;
            self.invoke_listeners(*node, &mut event, false);
            if event.propagation_stopped {
                self.trace_event_done(&event, "propagation_stopped");
                return event;
            }
        }

        self.trace_event_done(&event, "completed");
        event
    }

    fn invoke_listeners(&mut self, node_id: NodeId, event: &mut EventState, capture: bool) {
        let listeners = self.listeners.get(node_id, &event.event_type, capture);
        for listener in listeners {
            if self.options.trace.enabled && self.options.trace.events {
                let phase = if capture { "capture" } else { "bubble" };
                let target_label = self.trace_node_label(event.target);
                let current_label = self.trace_node_label(event.current_target);
                self.trace_event_line(format!(
                    "[event] {} target={} current={} phase={} listener={:?}",
                    event.event_type, target_label, current_label, phase, listener.kind
                ));
            }
            self.run_listener(&listener.kind, event);
        }
    }

    fn run_listener(&mut self, kind: &ListenerKind, event: &mut EventState) {
        match kind {
            ListenerKind::TrackValue => self.refresh_block(event.current_target),
            ListenerKind::Bypass => self.arm_expiring_bypass(event.current_target),
            ListenerKind::Reset { container_selector } => {
                self.reset_within(event.current_target, container_selector)
            }
            ListenerKind::NavigationGuard => {
                let dirty = self.is_dirty();
                self.tracker.guard.handle_before_unload(dirty, event);
            }
            ListenerKind::RecordDirty => {
                // Hand-dispatched events carry no payload.
                if let Some(dirty) = event.detail {
                    self.notifications.push(DirtyNotification {
                        dirty,
                        at_ms: self.timers.now_ms(),
                    });
                }
            }
            ListenerKind::PreventDefault => event.default_prevented = true,
            ListenerKind::StopPropagation => event.propagation_stopped = true,
        }
    }


    pub fn now_ms(&self) -> i64 {
        self.timers.now_ms()
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        self.timers.pending()
    }

    pub fn clear_timer(&mut self, timer: TimerId) -> bool {
        self.cancel_timer(timer)
    }

    pub fn clear_all_timers(&mut self) -> usize {
        let cleared = self.timers.clear_all();
        self.trace_timer_line(format!("[timer] clear_all cleared={cleared}"));
        cleared
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::InvalidArgument(
                "set_timer_step_limit requires at least 1 step".into(),
            ));
        }
        self.options.timer_step_limit = max_steps;
        Ok(())
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::InvalidArgument(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let from = self.timers.now_ms();
        self.timers.set_now_ms(from.saturating_add(delta_ms));
        let ran = self.run_timer_queue(Some(self.timers.now_ms()), false)?;
        self.trace_timer_line(format!(
            "[timer] advance delta_ms={delta_ms} from={from} to={} ran_due={ran}",
            self.timers.now_ms()
        ));
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        let from = self.timers.now_ms();
        if target_ms < from {
            return Err(Error::InvalidArgument(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={from})"
            )));
        }
        self.timers.set_now_ms(target_ms);
        let ran = self.run_timer_queue(Some(target_ms), false)?;
        self.trace_timer_line(format!(
            "[timer] advance_to from={from} to={target_ms} ran_due={ran}"
        ));
        Ok(())
    }

    /// Runs timers already due without moving the clock.
    pub fn run_due_timers(&mut self) -> Result<usize> {
        let ran = self.run_timer_queue(Some(self.timers.now_ms()), false)?;
        self.trace_timer_line(format!(
            "[timer] run_due now_ms={} ran={ran}",
            self.timers.now_ms()
        ));
        Ok(ran)
    }

    /// Runs every pending timer, moving the clock forward to each one.
    pub fn flush(&mut self) -> Result<usize> {
        let from = self.timers.now_ms();
        let ran = self.run_timer_queue(None, true)?;
        self.trace_timer_line(format!(
            "[timer] flush from={from} to={} ran={ran}",
            self.timers.now_ms()
        ));
        Ok(ran)
    }

    fn run_timer_queue(&mut self, due_limit: Option<i64>, advance_clock: bool) -> Result<usize> {
        let mut steps = 0usize;
        loop {
            if steps >= self.options.timer_step_limit {
                if self.timers.pop_next(due_limit).is_none() {
                    break;
                }
                return Err(Error::TimerStepLimit {
                    limit: self.options.timer_step_limit,
                    now_ms: self.timers.now_ms(),
                    pending: self.timers.len() + 1,
                });
            }
            let Some(task) = self.timers.pop_next(due_limit) else {
                break;
            };
            steps += 1;
            if advance_clock && task.due_at > self.timers.now_ms() {
                self.timers.set_now_ms(task.due_at);
            }
            self.execute_timer_task(task);
        }
        Ok(steps)
    }

    fn execute_timer_task(&mut self, task: ScheduledTask) {
        self.trace_timer_line(format!(
            "[timer] run id={} due_at={} now_ms={}",
            task.id,
            task.due_at,
            self.timers.now_ms()
        ));
        match task.task {
            TimerTask::ExpireBypass { node } => {
                if self.tracker.expire_bypass(node, task.id) {
                    self.dom.toggle_flag_attr(node, ATTR_BYPASS, false);
                    let label = self.trace_node_label(node);
                    self.trace_tracker_line(format!("[safe_edits] bypass expired {label}"));
                    self.trigger_dirty_update();
                }
            }
        }
    }

    fn cancel_timer(&mut self, timer: TimerId) -> bool {
        let removed = self.timers.clear(timer);
        self.trace_timer_line(format!("[timer] clear id={timer} removed={removed}"));
        removed
    }


    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.node(selector)?;
        let actual = self.dom.value(target);
        if actual != expected {
            return Err(self.assertion_failed(selector, target, expected, &actual));
        }
        Ok(())
    }

    pub fn assert_checked(&self, selector: &str, expected: bool) -> Result<()> {
        let target = self.node(selector)?;
        let actual = self.dom.checked(target);
        if actual != expected {
            return Err(self.assertion_failed(
                selector,
                target,
                &expected.to_string(),
                &actual.to_string(),
            ));
        }
        Ok(())
    }

    /// `expected` of `None` asserts the attribute is absent.
    pub fn assert_attr(&self, selector: &str, name: &str, expected: Option<&str>) -> Result<()> {
        let target = self.node(selector)?;
        let actual = self.dom.attr(target, name);
        if actual.as_deref() != expected {
            return Err(self.assertion_failed(
                selector,
                target,
                &format!("{name}={expected:?}"),
                &format!("{name}={actual:?}"),
            ));
        }
        Ok(())
    }

    pub fn assert_dirty(&self, expected: bool) -> Result<()> {
        let actual = self.is_dirty();
        if actual != expected {
            let root = self.dom.root;
            return Err(self.assertion_failed(
                "document",
                root,
                &format!("dirty={expected}"),
                &format!("dirty={actual}"),
            ));
        }
        Ok(())
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        Ok(self.dom.dump_node(self.node(selector)?))
    }

    fn assertion_failed(&self, selector: &str, node: NodeId, expected: &str, actual: &str) -> Error {
        Error::AssertionFailed {
            selector: selector.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            dom_snippet: truncate_chars(&self.dom.dump_node(node), 200),
        }
    }

    fn describe_element(&self, node: NodeId) -> String {
        match self.dom.input_type(node) {
            Some(kind) => format!("input[type={kind}]"),
            None => self.dom.tag_name(node).unwrap_or("non-element").to_string(),
        }
    }


    pub fn enable_trace(&mut self, enabled: bool) {
        self.options.trace.enabled = enabled;
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.options.trace.events = enabled;
    }

    pub fn set_trace_timers(&mut self, enabled: bool) {
        self.options.trace.timers = enabled;
    }

    pub fn set_trace_tracker(&mut self, enabled: bool) {
        self.options.trace.tracker = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::InvalidArgument(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.options.trace.log_limit = max_entries;
        while self.trace_logs.len() > max_entries {
            self.trace_logs.pop_front();
        }
        Ok(())
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace_logs.drain(..).collect()
    }

    fn trace_event_done(&mut self, event: &EventState, outcome: &str) {
        if !(self.options.trace.enabled && self.options.trace.events) {
            return;
        }
        let target_label = self.trace_node_label(event.target);
        self.trace_event_line(format!(
            "[event] done {} target={} outcome={} default_prevented={}",
            event.event_type, target_label, outcome, event.default_prevented
        ));
    }

    fn trace_node_label(&self, node: NodeId) -> String {
        if node == self.dom.root {
            return "document".into();
        }
        if let Some(id) = self.dom.attr(node, "id").filter(|id| !id.is_empty()) {
            return format!("#{id}");
        }
        self.dom
            .tag_name(node)
            .map(str::to_string)
            .unwrap_or_else(|| format!("node:{}", node.0))
    }

    fn trace_event_line(&mut self, line: String) {
        if self.options.trace.events {
            self.trace_line(line);
        }
    }

    fn trace_timer_line(&mut self, line: String) {
        if self.options.trace.timers {
            self.trace_line(line);
        }
    }

    fn trace_tracker_line(&mut self, line: String) {
        if self.options.trace.tracker {
            self.trace_line(line);
        }
    }

    fn trace_line(&mut self, line: String) {
        if !self.options.trace.enabled {
            return;
        }
        tracing::debug!(target: "safe_edits", "{line}");
        if self.trace_logs.len() >= self.options.trace.log_limit {
            self.trace_logs.pop_front();
        }
        self.trace_logs.push_back(line);
    }
}
