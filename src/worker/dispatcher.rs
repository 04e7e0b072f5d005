// src/worker/dispatcher.rs

use crate::errors::Result;
use crate::params::ParameterBuilder;
use crate::tree::{NodeId, WorkTree};

use super::AsAny;
use super::blueprint::{BlueprintList, Builder};
use super::context::RunContext;

/// A branch worker that expands into child nodes.
pub trait Dispatcher: AsAny + Send {
    /// Declare parameters. Runs before `create_blueprints`, since blueprint
    /// choices are usually parameters themselves.
    fn create_parameters(&mut self, _params: &mut ParameterBuilder) -> Result<()> {
        Ok(())
    }

    /// List every child this dispatcher could ever build.
    fn create_blueprints(
        &mut self,
        blueprints: &mut BlueprintList,
        params: &mut ParameterBuilder,
    ) -> Result<()>;

    /// Build the children actually needed and wire their dependencies.
    fn build(&mut self, builder: &mut Builder<'_>) -> Result<()>;

    /// Simulation counterpart of `build`: every blueprint once, so a schema
    /// walk sees every possible subtree.
    fn build_simulation(&mut self, builder: &mut Builder<'_>) -> Result<()> {
        builder.dispatch_all()?;
        Ok(())
    }

    /// Children of a sample root start a new `samples/<name>` path.
    fn is_sample_root(&self) -> bool {
        false
    }
}

/// A dispatcher plus its memoized blueprint list.
pub struct DispatcherWorker {
    dispatcher: Box<dyn Dispatcher>,
    blueprints: Option<BlueprintList>,
}

impl DispatcherWorker {
    pub fn new(dispatcher: Box<dyn Dispatcher>) -> Self {
        Self {
            dispatcher,
            blueprints: None,
        }
    }

    pub fn dispatcher(&self) -> &dyn Dispatcher {
        self.dispatcher.as_ref()
    }

    pub fn dispatcher_mut(&mut self) -> &mut dyn Dispatcher {
        self.dispatcher.as_mut()
    }

    pub fn blueprints(&self) -> Option<&BlueprintList> {
        self.blueprints.as_ref()
    }

    pub fn is_prepared(&self) -> bool {
        self.blueprints.is_some()
    }

    /// Declare parameters, then blueprints. Repeated calls are no-ops.
    pub fn prepare(&mut self, params: &mut ParameterBuilder) -> Result<()> {
        if self.is_prepared() {
            return Ok(());
        }
        self.dispatcher.create_parameters(params)?;
        let mut blueprints = BlueprintList::new();
        self.dispatcher.create_blueprints(&mut blueprints, params)?;
        self.blueprints = Some(blueprints);
        Ok(())
    }

    /// Build (or simulate) the subtree below `node`. Returns the new
    /// children.
    pub fn expand(
        &mut self,
        tree: &mut WorkTree,
        node: NodeId,
        ctx: &RunContext,
    ) -> Result<Vec<NodeId>> {
        let blueprints = self.blueprints.get_or_insert_with(BlueprintList::new);
        let mut builder = Builder::new(tree, node, blueprints, ctx);
        if ctx.is_simulating() {
            self.dispatcher.build_simulation(&mut builder)?;
        } else {
            self.dispatcher.build(&mut builder)?;
        }
        Ok(builder.into_created())
    }
}
