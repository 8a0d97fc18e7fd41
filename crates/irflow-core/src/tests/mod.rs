/*! Test coverage for IR construction and validation.
 *
 * The data-flow layer trusts the structural invariants the builders establish. These tests pin
 * them down: id allocation, operand roles, expression binding, control-flow shapes and the
 * checks `Program::validate` performs.
 */

mod program_tests;
