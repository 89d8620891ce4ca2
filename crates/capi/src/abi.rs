use crate::capability::CapabilityHost;
use std::sync::Arc;
use vorpal_rt::{CallingFrame, FuncType, HostErrorCategory, HostFuncEntity, HostOutcome, Val, ValType};

/// Builds the host function ABI thunk of: `thunk(data, calling_frame, args[],
/// results[]) -> (category, code)`, with `data` fixed to the capability host a
/// given function delegates to. This is the "wrapped" variant — callers provide
/// a typed bridge closure and never touch the dynamic `(category, code)` pair by
/// hand unless their capability call can itself fail.
pub fn capability_thunk<F>(
    ty: FuncType,
    host: Arc<dyn CapabilityHost>,
    bridge: F,
) -> HostFuncEntity
where
    F: Fn(&dyn CapabilityHost, CallingFrame<'_>, &[Val], &mut [Val]) -> HostOutcome + Send + Sync + 'static,
{
    HostFuncEntity::wrap(ty, host, move |host: &Arc<dyn CapabilityHost>, frame, args, results| {
        bridge(host.as_ref(), frame, args, results)
    })
}

/// `random_get(len: i32) -> i32` (the buffer is returned as a result value here
/// rather than written through a guest pointer, since this crate's executor
/// doesn't expose a raw-bytes-out parameter convention beyond `Val`): fills
/// `results[0]` with the low 32 bits of `len` random bytes drawn from the host.
pub fn random_get_func(host: Arc<dyn CapabilityHost>) -> HostFuncEntity {
    let ty = FuncType::new([ValType::I32], [ValType::I32]);
    capability_thunk(ty, host, |host, _frame, args, results| {
        let len = match args.first() {
            Some(Val::I32(n)) if *n >= 0 => *n as usize,
            _ => return error_outcome(),
        };
        let bytes = host.random(len.min(4));
        let mut word = [0u8; 4];
        word[..bytes.len().min(4)].copy_from_slice(&bytes[..bytes.len().min(4)]);
        results[0] = Val::I32(i32::from_le_bytes(word));
        HostOutcome::Success
    })
}

fn error_outcome() -> HostOutcome {
    HostOutcome::Error {
        category: HostErrorCategory::UserLevelError,
        code: 0,
    }
}
