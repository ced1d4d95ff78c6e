//! Control and data actions: logging, waiting, signals, variables, branching.

use log::{debug, error, info, warn};

use crate::actions::add;
use crate::resources::actionregistry::{ActionMeta, ActionRegistryBuilder, ParamKind};
use crate::resources::interpreter::{
    ActionContext, ActionError, ActionOutcome, ActionParams, Interpreter, Wait,
};

pub(crate) fn register(builder: &mut ActionRegistryBuilder) {
    add(
        builder,
        "log",
        log_action,
        ActionMeta::new("debug", "Write a message to the log")
            .param("message", ParamKind::Text, "text to write")
            .optional("level", ParamKind::Text, "debug, info, warn or error"),
    );
    add(
        builder,
        "wait",
        wait_action,
        ActionMeta::new("control", "Suspend the run for scene-scaled seconds")
            .param("seconds", ParamKind::Number, "duration"),
    );
    add(
        builder,
        "wait_signal",
        wait_signal_action,
        ActionMeta::new("control", "Suspend the run until a named signal is notified")
            .param("name", ParamKind::Text, "signal name"),
    );
    add(
        builder,
        "notify",
        notify_action,
        ActionMeta::new("control", "Wake every run waiting on a named signal")
            .param("name", ParamKind::Text, "signal name"),
    );
    add(
        builder,
        "set_data",
        set_data_action,
        ActionMeta::new("data", "Store a value or the result of an expression in a variable")
            .param("name", ParamKind::Text, "variable path (g., f., t.)")
            .param("value", ParamKind::Expression, "value or expression"),
    );
    add(
        builder,
        "if",
        if_action,
        ActionMeta::new("control", "Branch on an expression")
            .param("condition", ParamKind::Expression, "expression to test")
            .pins(&["true", "false"]),
    );
}

fn log_action(ctx: &mut ActionContext<'_>, params: &ActionParams) -> Result<ActionOutcome, ActionError> {
    let message = params.require_str("message")?;
    match params.str("level").as_deref() {
        Some("debug") => debug!("[{:?}] {}", ctx.source, message),
        Some("warn") => warn!("[{:?}] {}", ctx.source, message),
        Some("error") => error!("[{:?}] {}", ctx.source, message),
        _ => info!("[{:?}] {}", ctx.source, message),
    }
    Ok(ActionOutcome::Done)
}

fn wait_action(_ctx: &mut ActionContext<'_>, params: &ActionParams) -> Result<ActionOutcome, ActionError> {
    let seconds = params.require_number("seconds")?;
    if seconds < 0.0 {
        return Err(ActionError::InvalidParam {
            name: "seconds".into(),
            reason: format!("{} is negative", seconds),
        });
    }
    if seconds == 0.0 {
        return Ok(ActionOutcome::Done);
    }
    Ok(ActionOutcome::Wait(Wait::Seconds(seconds as f32)))
}

fn wait_signal_action(
    _ctx: &mut ActionContext<'_>,
    params: &ActionParams,
) -> Result<ActionOutcome, ActionError> {
    let name = params.require_str("name")?;
    Ok(ActionOutcome::Wait(Wait::Signal(name)))
}

fn notify_action(ctx: &mut ActionContext<'_>, params: &ActionParams) -> Result<ActionOutcome, ActionError> {
    let name = params.require_str("name")?;
    let woken = ctx
        .world
        .get_resource_mut::<Interpreter>()
        .map_or(0, |mut interp| interp.notify(&name));
    debug!("notify '{}' woke {} task(s)", name, woken);
    Ok(ActionOutcome::Done)
}

fn set_data_action(ctx: &mut ActionContext<'_>, params: &ActionParams) -> Result<ActionOutcome, ActionError> {
    let name = params.require_str("name")?;
    let raw = params
        .get("value")
        .ok_or_else(|| ActionError::MissingParam("value".into()))?;
    // Substituted text is data, not an expression.
    let value = if params.is_substituted("value") {
        raw.clone()
    } else {
        ctx.evaluate_or_text(raw)?
    };
    ctx.store(&name, value)?;
    Ok(ActionOutcome::Done)
}

fn if_action(ctx: &mut ActionContext<'_>, params: &ActionParams) -> Result<ActionOutcome, ActionError> {
    let raw = params
        .get("condition")
        .ok_or_else(|| ActionError::MissingParam("condition".into()))?;
    let pin = if ctx.evaluate_param(raw)?.is_truthy() {
        "true"
    } else {
        "false"
    };
    Ok(ActionOutcome::Pin(pin.to_string()))
}
