//! Stdout capture for the embedded interpreter.
//!
//! `sys.stdout` of the interpreter is pointed at a fresh `_io.StringIO` for the
//! lifetime of a [`StdoutRedirect`]. The host process's stdout is never
//! touched, so separate interpreters never see each other's output.

use rustpython_vm::{PyObjectRef, PyResult, VirtualMachine};

/// Scoped replacement of `sys.stdout`. Dropping it puts the previous object
/// back, on success and error paths alike.
pub(crate) struct StdoutRedirect<'vm> {
    vm: &'vm VirtualMachine,
    stream: PyObjectRef,
    saved: Option<PyObjectRef>,
}

impl<'vm> StdoutRedirect<'vm> {
    pub(crate) fn install(vm: &'vm VirtualMachine) -> PyResult<Self> {
        let stream = new_string_io(vm)?;
        let saved = vm
            .sys_module
            .get_attr("stdout", vm)
            .unwrap_or_else(|_| vm.ctx.none());
        vm.sys_module.set_attr("stdout", stream.clone(), vm)?;
        Ok(Self {
            vm,
            stream,
            saved: Some(saved),
        })
    }

    /// Everything written to the stream so far. Empty if the executed code
    /// closed it.
    pub(crate) fn captured(&self) -> String {
        self.vm
            .call_method(&self.stream, "getvalue", ())
            .and_then(|value| value.str(self.vm))
            .map(|s| s.as_str().to_owned())
            .unwrap_or_default()
    }
}

impl Drop for StdoutRedirect<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            if let Err(exc) = self.vm.sys_module.set_attr("stdout", saved, self.vm) {
                tracing::warn!("failed to restore sys.stdout: {:?}", exc);
            }
        }
    }
}

// `_io` is imported while the interpreter sets up its own stdio, so it is
// always present in `sys.modules`.
fn new_string_io(vm: &VirtualMachine) -> PyResult<PyObjectRef> {
    let modules = vm.sys_module.get_attr("modules", vm)?;
    let io = modules.get_item("_io", vm)?;
    io.get_attr("StringIO", vm)?.call((), vm)
}
