use async_trait::async_trait;
use gridcore::{
    HandlerDescriptor, HandlerError, InputSchema, NodeResult, ParamKind, ParamSpec, Value,
};
use gridruntime::{Invocation, NodeHandler};

/// Min/max/mean summary of a grid, as three output slots
pub struct GridStatsNode;

#[async_trait]
impl NodeHandler for GridStatsNode {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor::new("grid.stats")
            .display_name("Grid Stats")
            .category("grid/inspect")
            .input(InputSchema::new().required(ParamSpec::new("grid", ParamKind::Grid)))
            .outputs(&["min", "max", "mean"])
    }

    async fn invoke(&self, call: Invocation) -> Result<NodeResult, HandlerError> {
        let grid = call.require_grid("grid")?;
        let values = grid.values();

        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        for &v in values {
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
        }
        let (min, max, mean) = if values.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            (min as f64, max as f64, sum / values.len() as f64)
        };

        Ok(NodeResult::slots(vec![
            Value::Float(min),
            Value::Float(max),
            Value::Float(mean),
        ]))
    }
}
