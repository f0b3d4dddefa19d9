use rayon::prelude::*;

use crate::core::BoneTransform;
use crate::node::{AnimNode, EvaluationContext};

/// One node instance together with the context it evaluates against.
pub struct EvaluationJob<'a, N: AnimNode> {
    pub node: &'a mut N,
    pub context: EvaluationContext<'a>,
    pub output: Vec<BoneTransform>,
}

impl<'a, N: AnimNode> EvaluationJob<'a, N> {
    pub fn new(node: &'a mut N, context: EvaluationContext<'a>) -> Self {
        Self {
            node,
            context,
            output: Vec::new(),
        }
    }
}

/// Evaluates independent node instances on the Rayon thread pool.
pub struct ParallelEvaluator;

impl ParallelEvaluator {
    pub fn evaluate<N: AnimNode>(jobs: &mut [EvaluationJob<'_, N>]) {
        jobs.par_iter_mut().for_each(|job| {
            job.output.clear();
            job.node.evaluate(&job.context, &mut job.output);
        });
    }
}
