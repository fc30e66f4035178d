use super::test_helpers::{
    Outcome, ScriptedEngine, create_test_converter, create_test_converter_with,
    wait_for_terminal,
};
use super::*;
use crate::engine::EngineProgress;
use crate::error::{EngineError, FailureKind};
use crate::types::{TaskId, TaskStatus};
use std::time::Duration;
