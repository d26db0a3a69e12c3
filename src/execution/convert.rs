//! JSON values to Python objects, for seeding the namespace.

use rustpython_vm::{PyObjectRef, PyResult, VirtualMachine};
use serde_json::Value;

pub(crate) fn json_to_pyobject(value: &Value, vm: &VirtualMachine) -> PyResult<PyObjectRef> {
    let obj = match value {
        Value::Null => vm.ctx.none(),
        Value::Bool(b) => vm.ctx.new_bool(*b).into(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                vm.ctx.new_int(i).into()
            } else if let Some(u) = n.as_u64() {
                vm.ctx.new_int(u).into()
            } else {
                vm.ctx.new_float(n.as_f64().unwrap_or(f64::NAN)).into()
            }
        }
        Value::String(s) => vm.ctx.new_str(s.as_str()).into(),
        Value::Array(items) => {
            let items = items
                .iter()
                .map(|item| json_to_pyobject(item, vm))
                .collect::<PyResult<Vec<_>>>()?;
            vm.ctx.new_list(items).into()
        }
        Value::Object(map) => {
            let dict = vm.ctx.new_dict();
            for (k, v) in map {
                dict.set_item(k.as_str(), json_to_pyobject(v, vm)?, vm)?;
            }
            dict.into()
        }
    };
    Ok(obj)
}
