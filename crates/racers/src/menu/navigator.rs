//! Single-hop front-end navigation.
//!
//! The game's UI engine handles a button press by calling a virtual handler
//! on the expected context (`ecx`) with the pressed button object as its only
//! argument. Navigating means synthesizing exactly that call for the button
//! that leads from the observed screen to the requested one.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::inject::{CodeInjector, Operand, Reg};
use crate::layout::GameLayout;
use crate::memory::AddressSpace;
use crate::process::RemoteProcess;

use super::{MenuState, TransitionEdge};

/// The UI engine's dispatch context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiContext {
    pub expected: u32,
    pub active: u32,
}

impl UiContext {
    /// A confirmation prompt is on screen.
    pub fn prompt_open(&self) -> bool {
        self.expected != self.active
    }
}

pub struct MenuNavigator<P: RemoteProcess> {
    space: AddressSpace<P>,
    injector: Arc<CodeInjector<P>>,
    layout: Arc<GameLayout>,
}

impl<P: RemoteProcess> MenuNavigator<P> {
    pub fn new(
        space: AddressSpace<P>,
        injector: Arc<CodeInjector<P>>,
        layout: Arc<GameLayout>,
    ) -> Self {
        Self {
            space,
            injector,
            layout,
        }
    }

    fn menu_object(&self) -> Result<u32> {
        self.space.read_u32(self.layout.menu.base)
    }

    /// The screen the game currently shows.
    pub fn current_menu(&self) -> Result<MenuState> {
        let object = self.menu_object()?;
        let code = self
            .space
            .read_u8(object.wrapping_add_signed(self.layout.menu.current_menu_offset))?;
        Ok(self.layout.menu_state(code))
    }

    pub fn context(&self) -> Result<UiContext> {
        let object = self.menu_object()?;
        let menu = &self.layout.menu;
        Ok(UiContext {
            expected: self
                .space
                .read_u32(object.wrapping_add_signed(menu.expected_context_offset))?,
            active: self
                .space
                .read_u32(object.wrapping_add_signed(menu.active_context_offset))?,
        })
    }

    /// Perform one transition from the observed screen toward `target`.
    ///
    /// Returns the edge taken, or `None` when the observed screen has no edge
    /// to `target` under the current prompt state. That case is not an error
    /// and writes nothing.
    pub fn goto(&self, target: MenuState) -> Result<Option<TransitionEdge>> {
        let current = self.current_menu()?;
        let context = self.context()?;
        let prompt = context.prompt_open();

        let Some(edge) = self.layout.menu_graph.find(current, target, prompt).copied() else {
            debug!(
                "No {}transition {} -> {}",
                if prompt { "prompt " } else { "" },
                current,
                target
            );
            return Ok(None);
        };

        debug!("{} -> {} (button {:#x})", current, target, edge.offset);
        let button = context.active.wrapping_add_signed(edge.offset);
        let slot = self.layout.menu.dispatch_slot;

        self.injector.run(0, |b| {
            b.push(Reg::Esi)
                .mov_imm(Reg::Ecx, context.expected)
                .mov_imm(Reg::Esi, button)
                .mov_load(Reg::Edx, Operand::Indirect(Reg::Ecx))
                .push(Reg::Esi)
                .call_indirect(Operand::Disp8(Reg::Edx, slot))
                .pop(Reg::Esi)
                .ret();
            Ok(())
        })?;

        Ok(Some(edge))
    }
}
