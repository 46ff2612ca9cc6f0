use safe_edits::{
    ATTR_BLOCK, ATTR_BYPASS, ATTR_MEMBER, DirtyNotification, Error, GuardState, Options, Page,
    Result,
};

const PROFILE_HTML: &str = r#"
<body>
  <form id='profile' data-safe-edits-container>
    <input id='name' value='foo'>
    <input id='agree' type='checkbox'>
    <select id='plan'>
      <option value='free'>Free</option>
      <option value='pro'>Pro</option>
    </select>
  </form>
  <div id='actions'>
    <input id='cancel' type='button' value='Cancel'>
  </div>
</body>
"#;

fn dirty_flags(page: &mut Page) -> Vec<bool> {
    page.take_dirty_notifications()
        .into_iter()
        .map(|note| note.dirty)
        .collect()
}

#[test]
fn untouched_registration_is_clean() -> Result<()> {
    let mut page = Page::from_html(PROFILE_HTML)?;
    page.register("profile")?;
    page.assert_dirty(false)?;
    assert!(!page.trigger_dirty_update());
    let clean = DirtyNotification {
        dirty: false,
        at_ms: 0,
    };
    assert_eq!(page.take_dirty_notifications(), vec![clean, clean]);
    Ok(())
}

#[test]
fn typing_away_and_back_toggles_block_and_notifies() -> Result<()> {
    let mut page = Page::from_html(PROFILE_HTML)?;
    page.register("profile")?;
    assert_eq!(dirty_flags(&mut page), vec![false]);

    page.type_text("#name", "bar")?;
    page.assert_attr("#name", ATTR_BLOCK, Some("true"))?;
    page.assert_dirty(true)?;
    assert_eq!(dirty_flags(&mut page), vec![true]);

    page.type_text("#name", "foo")?;
    page.assert_attr("#name", ATTR_BLOCK, None)?;
    page.assert_dirty(false)?;
    assert_eq!(dirty_flags(&mut page), vec![false]);
    Ok(())
}

#[test]
fn checking_an_unchecked_checkbox_is_dirty() -> Result<()> {
    let mut page = Page::from_html(PROFILE_HTML)?;
    page.register("profile")?;

    page.click("#agree")?;
    page.assert_checked("#agree", true)?;
    page.assert_dirty(true)?;

    page.set_checked("#agree", false)?;
    page.assert_dirty(false)
}

#[test]
fn block_state_follows_value_for_any_event_type() -> Result<()> {
    let mut page = Page::from_html(PROFILE_HTML)?;
    page.register_with("profile", "select", "change")?;

    page.select_option("#plan", "pro")?;
    page.assert_dirty(true)?;
    page.select_option("#plan", "free")?;
    page.assert_dirty(false)?;

    // Programmatic value changes count once the tracked event fires.
    page.set_attribute("#plan", "data-safe-edits-value", "custom")?;
    page.assert_dirty(false)?;
    page.dispatch("#plan", "change")?;
    page.assert_dirty(true)
}

#[test]
fn override_attribute_replaces_live_value() -> Result<()> {
    let html = "<form id='f'><input id='n' value='a' data-safe-edits-value='v1'></form>";
    let mut page = Page::from_html(html)?;
    page.register("f")?;

    page.type_text("#n", "b")?;
    page.assert_dirty(false)?;

    page.set_attribute("#n", "data-safe-edits-value", "v2")?;
    page.dispatch("#n", "input")?;
    page.assert_dirty(true)?;

    page.remove_attribute("#n", "data-safe-edits-value")?;
    page.dispatch("#n", "input")?;
    // Original was the override string, the live read is now the raw value.
    page.assert_dirty(true)
}

#[test]
fn bypass_beats_blocks_until_it_expires() -> Result<()> {
    let mut page = Page::from_html(PROFILE_HTML)?;
    page.register("profile")?;
    page.register_bypass("actions")?;

    page.type_text("#name", "bar")?;
    page.click("#cancel")?;
    page.assert_dirty(false)?;
    page.assert_attr("#cancel", ATTR_BYPASS, Some("true"))?;
    assert!(!page.request_unload().vetoed());

    page.advance_time(499)?;
    page.assert_dirty(false)?;
    page.take_dirty_notifications();

    page.advance_time(1)?;
    page.assert_dirty(true)?;
    page.assert_attr("#cancel", ATTR_BYPASS, None)?;
    assert_eq!(
        page.take_dirty_notifications(),
        vec![DirtyNotification {
            dirty: true,
            at_ms: 500
        }]
    );
    Ok(())
}

#[test]
fn rearmed_bypass_cancels_the_stale_timer() -> Result<()> {
    let mut page = Page::from_html(PROFILE_HTML)?;
    page.register("profile")?;
    page.register_bypass("actions")?;
    page.type_text("#name", "bar")?;

    page.click("#cancel")?;
    page.advance_time(300)?;
    page.click("#cancel")?;

    let pending = page.pending_timers();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].due_at, 800);

    page.advance_time_to(500)?;
    page.assert_dirty(false)?;
    page.advance_time_to(800)?;
    page.assert_dirty(true)?;
    assert!(page.pending_timers().is_empty());
    Ok(())
}

#[test]
fn bypass_window_is_configurable() -> Result<()> {
    let options = Options {
        bypass_expiry_ms: 100,
        ..Options::default()
    };
    let mut page = Page::from_html_with_options(PROFILE_HTML, options)?;
    page.register("profile")?;
    page.register_bypass("actions")?;
    page.type_text("#name", "bar")?;

    page.click("#cancel")?;
    assert_eq!(page.flush()?, 1);
    assert_eq!(page.now_ms(), 100);
    page.assert_dirty(true)
}

#[test]
fn manual_bypass_holds_until_cleared() -> Result<()> {
    let mut page = Page::from_html(PROFILE_HTML)?;
    page.register("profile")?;
    page.type_text("#name", "bar")?;

    page.bypass(true);
    page.assert_dirty(false)?;
    page.assert_attr("body", ATTR_BYPASS, Some("true"))?;
    assert!(page.pending_timers().is_empty());
    page.advance_time(10_000)?;
    page.assert_dirty(false)?;

    page.bypass(false);
    page.assert_dirty(true)?;
    page.assert_attr("body", ATTR_BYPASS, None)?;
    assert_eq!(dirty_flags(&mut page), vec![false, true, false, true]);
    Ok(())
}

#[test]
fn manual_bypass_clear_cancels_a_trigger_armed_on_body() -> Result<()> {
    let html = "<body id='page'><form id='f'><input id='n' value='a'></form></body>";
    let mut page = Page::from_html(html)?;
    page.register("f")?;
    page.type_text("#n", "b")?;

    // A bypass trigger on the body shares the document-wide marker.
    page.register_bypass_with("page", "body", "click")?;
    page.dispatch("body", "click")?;
    assert_eq!(page.pending_timers().len(), 1);

    page.bypass(false);
    assert!(page.pending_timers().is_empty());
    page.assert_dirty(true)
}

#[test]
fn reset_clears_blocks_inside_its_container_only() -> Result<()> {
    let html = r#"
    <main id='page'>
      <section id='a' data-safe-edits-container>
        <input id='a1' value='x'>
        <button id='a-reset' type='button'>Discard</button>
      </section>
      <section id='b' data-safe-edits-container>
        <input id='b1' value='y'>
      </section>
    </main>
    "#;
    let mut page = Page::from_html(html)?;
    page.register("page")?;
    page.register_reset_with("a", "button", "click")?;

    page.type_text("#a1", "x2")?;
    page.type_text("#b1", "y2")?;
    page.click("#a-reset")?;

    page.assert_attr("#a1", ATTR_BLOCK, None)?;
    page.assert_attr("#b1", ATTR_BLOCK, Some("true"))?;
    // Values are left as typed; only the markers move.
    page.assert_value("#a1", "x2")?;
    page.assert_dirty(true)?;

    page.type_text("#b1", "y")?;
    page.assert_dirty(false)
}

#[test]
fn reset_without_container_clears_the_whole_document() -> Result<()> {
    let html = r#"
    <div id='wrap'>
      <input id='one' value='1'>
      <input id='two' value='2'>
      <button id='discard' type='button'>Discard</button>
    </div>
    "#;
    let mut page = Page::from_html(html)?;
    page.register("wrap")?;
    page.register_reset_with("wrap", "button", "click")?;

    page.type_text("#one", "x")?;
    page.type_text("#two", "y")?;
    page.click("#discard")?;
    page.assert_dirty(false)
}

#[test]
fn reset_button_restores_form_and_clears_blocks() -> Result<()> {
    let html = r#"
    <form id='f' data-safe-edits-container>
      <input id='n' value='a'>
      <input id='c' type='checkbox' checked>
      <button id='r' type='reset'>Reset</button>
    </form>
    "#;
    let mut page = Page::from_html(html)?;
    page.register("f")?;
    page.register_reset_with("f", "button", "click")?;

    page.type_text("#n", "b")?;
    page.click("#c")?;
    page.assert_dirty(true)?;

    page.click("#r")?;
    page.assert_value("#n", "a")?;
    page.assert_checked("#c", true)?;
    page.assert_dirty(false)
}

#[test]
fn prevented_form_reset_keeps_values_but_clears_blocks() -> Result<()> {
    let html = r#"
    <form id='f'>
      <input id='n' value='a'>
      <button id='r' type='reset'>Reset</button>
    </form>
    "#;
    let mut page = Page::from_html(html)?;
    page.register("f")?;
    page.register_reset_with("f", "button", "click")?;
    page.prevent_default_on("#f", "reset")?;

    page.type_text("#n", "b")?;
    page.click("#r")?;
    page.assert_value("#n", "b")?;
    page.assert_dirty(false)?;

    page.type_text("#n", "bb")?;
    page.assert_dirty(true)
}

#[test]
fn adding_a_member_after_freeze_is_dirty_until_refrozen() -> Result<()> {
    let mut page = Page::from_html(PROFILE_HTML)?;
    page.register("profile")?;
    page.freeze(true);
    assert_eq!(page.is_frozen().map(<[_]>::len), Some(3));

    page.append_html("#profile", "<input id='extra' value='z'>")?;
    page.assert_dirty(false)?;
    page.register("profile")?;
    page.assert_attr("#extra", ATTR_MEMBER, Some("true"))?;
    page.assert_dirty(true)?;

    page.freeze(true);
    page.assert_dirty(false)?;

    let extra = page.remove("#extra")?;
    page.assert_dirty(true)?;
    page.append_node("#profile", extra)?;
    page.assert_dirty(false)?;

    page.freeze(false);
    assert_eq!(page.is_frozen(), None);
    Ok(())
}

#[test]
fn late_registration_while_frozen_notifies_dirty() -> Result<()> {
    let mut page = Page::from_html("<form id='f'><input id='a' value='1'></form>")?;
    page.register("f")?;
    page.freeze(true);
    page.append_html("#f", "<input id='b' value='2'>")?;
    page.take_dirty_notifications();

    page.register("f")?;
    assert_eq!(dirty_flags(&mut page), vec![true]);

    page.register_bypass_with("f", "#b", "click")?;
    page.register_reset_with("f", "#a", "click")?;
    assert_eq!(dirty_flags(&mut page), vec![true, true]);
    Ok(())
}

#[test]
fn container_marker_must_be_true() -> Result<()> {
    let html = r#"
    <main id='page' data-safe-edits-container='true'>
      <section id='inner' data-safe-edits-container='false'>
        <input id='in' value='x'>
        <button id='discard' type='button'>Discard</button>
      </section>
      <input id='out' value='y'>
    </main>
    "#;
    let mut page = Page::from_html(html)?;
    page.register("page")?;
    page.register_reset_with("inner", "button", "click")?;

    page.type_text("#in", "x2")?;
    page.type_text("#out", "y2")?;
    page.click("#discard")?;
    // The `false` section is skipped; the reset reaches the outer container.
    page.assert_attr("#in", ATTR_BLOCK, None)?;
    page.assert_attr("#out", ATTR_BLOCK, None)?;
    page.assert_dirty(false)
}

#[test]
fn reordering_members_is_not_a_structural_change() -> Result<()> {
    let mut page = Page::from_html(PROFILE_HTML)?;
    page.register("profile")?;
    page.freeze(true);

    let name = page.node("#name")?;
    page.append_node("#profile", name)?;
    assert_eq!(page.members().last(), Some(&name));
    page.assert_dirty(false)
}

#[test]
fn removed_blocked_member_stops_counting() -> Result<()> {
    let mut page = Page::from_html(PROFILE_HTML)?;
    page.register("profile")?;
    page.type_text("#name", "bar")?;

    let name = page.remove("#name")?;
    page.assert_dirty(false)?;
    assert!(page.tracker().is_blocked(name));

    page.append_node("#profile", name)?;
    page.assert_dirty(true)
}

#[test]
fn registering_twice_keeps_one_listener_and_first_original() -> Result<()> {
    let mut page = Page::from_html(PROFILE_HTML)?;
    page.register("profile")?;
    page.type_text("#name", "bar")?;
    page.take_dirty_notifications();

    assert_eq!(page.register("profile")?, 3);
    assert_eq!(page.listener_count("#name", "input")?, 1);
    assert_eq!(dirty_flags(&mut page), vec![true]);

    page.type_text("#name", "baz")?;
    assert_eq!(dirty_flags(&mut page), vec![true]);
    page.type_text("#name", "foo")?;
    assert_eq!(dirty_flags(&mut page), vec![false]);
    Ok(())
}

#[test]
fn guard_vetoes_only_while_active_and_dirty() -> Result<()> {
    let mut page = Page::from_html(PROFILE_HTML)?;
    page.register("profile")?;
    assert_eq!(page.guard_state(), GuardState::Inactive);

    page.type_text("#name", "bar")?;
    assert!(!page.request_unload().vetoed());

    page.activate();
    let outcome = page.request_unload();
    assert!(outcome.default_prevented);
    assert_eq!(outcome.return_value.as_deref(), Some(""));

    page.type_text("#name", "foo")?;
    assert!(!page.request_unload().vetoed());

    page.type_text("#name", "bar")?;
    page.deactivate();
    assert_eq!(page.guard_state(), GuardState::Inactive);
    assert!(!page.request_unload().vetoed());
    Ok(())
}

#[test]
fn stopping_propagation_does_not_hide_edits_from_the_member() -> Result<()> {
    let mut page = Page::from_html(PROFILE_HTML)?;
    page.register("profile")?;
    page.stop_propagation_on("#name", "input")?;

    page.type_text("#name", "bar")?;
    page.assert_dirty(true)
}

#[test]
fn registration_errors_name_the_missing_target() -> Result<()> {
    let mut page = Page::from_html(PROFILE_HTML)?;
    match page.register_bypass("missing") {
        Err(Error::ContainerNotFound(id)) => assert_eq!(id, "missing"),
        other => panic!("expected ContainerNotFound, got: {other:?}"),
    }
    match page.assert_dirty(true) {
        Err(Error::AssertionFailed { selector, .. }) => assert_eq!(selector, "document"),
        other => panic!("expected AssertionFailed, got: {other:?}"),
    }
    Ok(())
}

#[test]
fn trace_log_covers_events_timers_and_tracker() -> Result<()> {
    let mut page = Page::from_html(PROFILE_HTML)?;
    page.enable_trace(true);
    page.register("profile")?;
    page.register_bypass("actions")?;
    page.click("#cancel")?;
    page.advance_time(500)?;

    let logs = page.take_trace_logs();
    assert!(
        logs.iter()
            .any(|line| line == "[timer] schedule timeout id=1 due_at=500 delay_ms=500")
    );
    assert!(logs.iter().any(|line| line == "[safe_edits] bypass expired #cancel"));
    assert!(
        logs.iter()
            .any(|line| line.starts_with("[event] click target=#cancel current=#cancel"))
    );

    page.set_trace_timers(false);
    page.set_trace_events(false);
    page.set_trace_tracker(false);
    page.click("#cancel")?;
    assert!(page.take_trace_logs().is_empty());
    Ok(())
}
