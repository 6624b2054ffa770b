//! WGSL program loading

use crate::backend::{ProgramHandle, ProgramPass, ShaderProvider};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Full-screen vertex stage and source bindings, prepended to every program
pub const FULLSCREEN_PRELUDE: &str = include_str!("../../shaders/fullscreen.wgsl");

/// Name of the built-in copy program used for plain blits
pub const BLIT_PROGRAM: &str = "veil/blit";

const BLIT_SOURCE: &str = include_str!("../../shaders/blit.wgsl");

/// A compiled program: one module, one fragment entry point per pass
pub struct Program {
    pub name: String,
    pub module: wgpu::ShaderModule,
    pub passes: Vec<&'static str>,
    /// Bumped every time the name is re-registered
    pub generation: u32,
}

/// Compiled programs addressable by name
pub struct ShaderLibrary {
    device: Arc<wgpu::Device>,
    programs: Vec<Program>,
    by_name: HashMap<String, ProgramHandle>,
    blit: ProgramHandle,
}

impl ShaderLibrary {
    /// Create the library with the built-in blit program loaded
    pub fn new(device: Arc<wgpu::Device>) -> Result<Self> {
        let mut library = Self {
            device,
            programs: Vec::new(),
            by_name: HashMap::new(),
            blit: ProgramHandle(0),
        };
        library.blit = library.register(BLIT_PROGRAM, BLIT_SOURCE, &["fs_blit"])?;
        Ok(library)
    }

    /// Compile `source` (fragment stages only) and make it available as `name`
    ///
    /// `passes` lists the fragment entry points in pass-index order. A
    /// program that fails validation is not registered, so lookups keep
    /// returning `None` for it.
    pub fn register(&mut self, name: &str, source: &str, passes: &[&'static str]) -> Result<ProgramHandle> {
        if passes.is_empty() {
            return Err(Error::Shader(format!("Program '{}' has no passes", name)));
        }

        let full_source = format!("{}\n{}", FULLSCREEN_PRELUDE, source);
        let module = self.compile(name, full_source)?;

        let program = Program {
            name: name.to_string(),
            module,
            passes: passes.to_vec(),
            generation: 0,
        };

        // Re-registering a name replaces the program in place under the same
        // handle; the new generation invalidates pipelines built from the old one
        let handle = match self.by_name.get(name) {
            Some(&handle) => {
                let slot = &mut self.programs[handle.0 as usize];
                let generation = slot.generation.wrapping_add(1);
                *slot = Program { generation, ..program };
                handle
            }
            None => {
                let handle = ProgramHandle(self.programs.len() as u32);
                self.programs.push(program);
                self.by_name.insert(name.to_string(), handle);
                handle
            }
        };

        log::info!("Registered program '{}' ({} pass(es))", name, passes.len());
        Ok(handle)
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn compile(&self, name: &str, source: String) -> Result<wgpu::ShaderModule> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => {
                log::warn!("Program '{}' failed to compile: {}", name, err);
                Err(Error::Shader(format!("'{}': {}", name, err)))
            }
            None => Ok(module),
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn compile(&self, name: &str, source: String) -> Result<wgpu::ShaderModule> {
        Ok(self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        }))
    }

    pub fn get(&self, handle: ProgramHandle) -> Option<&Program> {
        self.programs.get(handle.0 as usize)
    }

    /// Current generation of a program, see [`Program::generation`]
    pub fn generation(&self, handle: ProgramHandle) -> Option<u32> {
        self.get(handle).map(|program| program.generation)
    }

    /// Handle of the built-in copy program
    pub fn blit_program(&self) -> ProgramPass {
        ProgramPass::new(self.blit, 0)
    }

    /// Module and fragment entry point for one pass of a program
    pub fn fragment(&self, pass: ProgramPass) -> Result<(&wgpu::ShaderModule, &'static str)> {
        let program = self
            .get(pass.program)
            .ok_or_else(|| Error::Shader(format!("Unknown program {:?}", pass.program)))?;
        let entry = program.passes.get(pass.index as usize).ok_or_else(|| {
            Error::Shader(format!(
                "Program '{}' has no pass {}",
                program.name, pass.index
            ))
        })?;
        Ok((&program.module, entry))
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

impl ShaderProvider for ShaderLibrary {
    fn program(&self, name: &str) -> Option<ProgramHandle> {
        self.by_name.get(name).copied()
    }
}
