//! ---
//! dfbs_section: "03-logging"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Context-enriched logging macros."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
/// Emit an event at the given level enriched with access context.
#[doc(hidden)]
#[macro_export]
macro_rules! __gate_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            user = ctx.user.unwrap_or(""),
            vision = ctx.vision.unwrap_or(""),
            route = ctx.route.unwrap_or(""),
            capability = ctx.capability.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with access context.
#[macro_export]
macro_rules! gate_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__gate_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__gate_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with access context.
#[macro_export]
macro_rules! gate_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__gate_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__gate_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with access context.
#[macro_export]
macro_rules! gate_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__gate_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__gate_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}
