use crate::buffer::view::{BufferView, BufferViewMut};
use crate::dispatch::context::DispatchContext;
use crate::dispatch::dispatcher::DispatchStats;
use crate::foundation::error::{DispatchError, DispatchResult};
use crate::kernel::{Kernel, KernelInfo, WithInfo};
use crate::launch::clip::LaunchParams;

type Invokable = Box<dyn Fn(&[u8]) + Send + Sync>;

struct Exported<T> {
    name: String,
    item: T,
}

/// Loaded script: exported forEach kernels and invokable functions addressed by slot.
///
/// Slots are assigned in registration order. The module-level `threadable` flag applies to every
/// kernel; a kernel runs on several workers only when both the module and the kernel allow it.
pub struct ScriptModule {
    name: String,
    threadable: bool,
    kernels: Vec<Exported<Box<dyn Kernel + Send>>>,
    invokables: Vec<Exported<Invokable>>,
}

impl ScriptModule {
    /// Start building a module called `name`.
    pub fn builder(name: impl Into<String>) -> ScriptModuleBuilder {
        ScriptModuleBuilder {
            module: Self {
                name: name.into(),
                threadable: true,
                kernels: Vec::new(),
                invokables: Vec::new(),
            },
        }
    }

    /// Module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module-level threadable flag.
    pub fn is_threadable(&self) -> bool {
        self.threadable
    }

    /// Number of exported kernels.
    pub fn kernel_count(&self) -> usize {
        self.kernels.len()
    }

    /// Number of invokable functions.
    pub fn invokable_count(&self) -> usize {
        self.invokables.len()
    }

    /// Slot of the kernel exported as `name`.
    pub fn kernel_slot(&self, name: &str) -> Option<usize> {
        self.kernels.iter().position(|k| k.name == name)
    }

    /// Slot of the invokable exported as `name`.
    pub fn invokable_slot(&self, name: &str) -> Option<usize> {
        self.invokables.iter().position(|f| f.name == name)
    }

    /// Metadata the dispatcher sees for kernel `slot`, module flags applied.
    pub fn kernel_info(&self, slot: usize) -> DispatchResult<KernelInfo> {
        let k = self.kernel(slot)?;
        let mut info = k.info();
        info.threadable &= self.threadable;
        Ok(info)
    }

    /// Launch exported kernel `slot`.
    #[tracing::instrument(level = "debug", skip(self, ctx, input, output, launch), fields(script = %self.name))]
    pub fn for_each(
        &self,
        ctx: &DispatchContext,
        slot: usize,
        input: Option<BufferView<'_>>,
        output: Option<BufferViewMut<'_>>,
        launch: &LaunchParams<'_>,
    ) -> DispatchResult<DispatchStats> {
        let info = self.kernel_info(slot)?;
        let kernel = WithInfo {
            kernel: self.kernel(slot)?,
            info,
        };
        ctx.dispatch(&kernel, input, output, launch)
    }

    /// Call invokable `slot` with verbatim parameter bytes.
    #[tracing::instrument(level = "debug", skip(self, params), fields(script = %self.name, params_len = params.len()))]
    pub fn invoke(&self, slot: usize, params: &[u8]) -> DispatchResult<()> {
        let f = self
            .invokables
            .get(slot)
            .ok_or(DispatchError::UnknownSlot {
                kind: "invokable",
                slot,
            })?;
        (f.item)(params);
        Ok(())
    }

    fn kernel(&self, slot: usize) -> DispatchResult<&(dyn Kernel + Send)> {
        self.kernels
            .get(slot)
            .map(|k| k.item.as_ref())
            .ok_or(DispatchError::UnknownSlot {
                kind: "kernel",
                slot,
            })
    }
}

impl std::fmt::Debug for ScriptModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptModule")
            .field("name", &self.name)
            .field("threadable", &self.threadable)
            .field(
                "kernels",
                &self.kernels.iter().map(|k| &k.name).collect::<Vec<_>>(),
            )
            .field(
                "invokables",
                &self.invokables.iter().map(|f| &f.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for [`ScriptModule`].
pub struct ScriptModuleBuilder {
    module: ScriptModule,
}

impl ScriptModuleBuilder {
    /// Set the module-level threadable flag (default `true`).
    pub fn threadable(mut self, threadable: bool) -> Self {
        self.module.threadable = threadable;
        self
    }

    /// Export a forEach kernel at the next kernel slot.
    pub fn kernel(mut self, name: impl Into<String>, kernel: impl Kernel + Send + 'static) -> Self {
        self.module.kernels.push(Exported {
            name: name.into(),
            item: Box::new(kernel),
        });
        self
    }

    /// Export an invokable function at the next invokable slot.
    pub fn invokable(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&[u8]) + Send + Sync + 'static,
    ) -> Self {
        self.module.invokables.push(Exported {
            name: name.into(),
            item: Box::new(f),
        });
        self
    }

    /// Finish the module; export names must be unique per table.
    pub fn build(self) -> DispatchResult<ScriptModule> {
        let m = self.module;
        if let Some(dup) = first_duplicate(m.kernels.iter().map(|k| k.name.as_str())) {
            return Err(DispatchError::validation(format!(
                "script '{}' exports kernel '{dup}' twice",
                m.name
            )));
        }
        if let Some(dup) = first_duplicate(m.invokables.iter().map(|f| f.name.as_str())) {
            return Err(DispatchError::validation(format!(
                "script '{}' exports invokable '{dup}' twice",
                m.name
            )));
        }
        tracing::debug!(
            script = %m.name,
            kernels = m.kernels.len(),
            invokables = m.invokables.len(),
            threadable = m.threadable,
            "script module built"
        );
        Ok(m)
    }
}

fn first_duplicate<'a>(mut names: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = std::collections::HashSet::new();
    names.find(|n| !seen.insert(*n))
}

#[cfg(test)]
#[path = "../../tests/unit/script/module.rs"]
mod tests;
