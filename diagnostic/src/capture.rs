use codediag_core::DiagnosticContext;
use codediag_core::Failure;
use codediag_core::failure::payload_message;
use std::panic;
use std::panic::PanicHookInfo;
use std::panic::UnwindSafe;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static>;

pub(crate) fn catch<R>(
    ctx: &Arc<DiagnosticContext>,
    f: impl FnOnce() -> R + UnwindSafe,
) -> Result<R, Failure> {
    let slot: Arc<Mutex<Option<Failure>>> = Arc::new(Mutex::new(None));
    let previous: Arc<PanicHook> = Arc::new(panic::take_hook());

    let hook_slot = Arc::clone(&slot);
    let hook_previous = Arc::clone(&previous);
    let hook_ctx = Arc::clone(ctx);
    let owner = thread::current().id();
    panic::set_hook(Box::new(move |info| {
        if thread::current().id() != owner {
            hook_previous(info);
            return;
        }
        let failure = Failure::capture(payload_message(info.payload()), &hook_ctx);
        *hook_slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(failure);
    }));

    let outcome = panic::catch_unwind(f);

    // Dropping our hook releases its handle on the previous one
    drop(panic::take_hook());
    match Arc::try_unwrap(previous) {
        Ok(hook) => panic::set_hook(hook),
        Err(shared) => panic::set_hook(Box::new(move |info| shared(info))),
    }

    outcome.map_err(|payload| {
        let captured = slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        captured.unwrap_or_else(|| Failure {
            message: payload_message(payload.as_ref()),
            stack: String::new(),
            call_sites: Vec::new(),
        })
    })
}
