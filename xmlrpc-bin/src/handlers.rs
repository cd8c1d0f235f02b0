//! Demonstration methods served by the binary

use xmlrpc_core::{Dispatcher, Fault, HandlerError, Value};

const STATES: [&str; 50] = [
    "Alabama",
    "Alaska",
    "Arizona",
    "Arkansas",
    "California",
    "Colorado",
    "Connecticut",
    "Delaware",
    "Florida",
    "Georgia",
    "Hawaii",
    "Idaho",
    "Illinois",
    "Indiana",
    "Iowa",
    "Kansas",
    "Kentucky",
    "Louisiana",
    "Maine",
    "Maryland",
    "Massachusetts",
    "Michigan",
    "Minnesota",
    "Mississippi",
    "Missouri",
    "Montana",
    "Nebraska",
    "Nevada",
    "New Hampshire",
    "New Jersey",
    "New Mexico",
    "New York",
    "North Carolina",
    "North Dakota",
    "Ohio",
    "Oklahoma",
    "Oregon",
    "Pennsylvania",
    "Rhode Island",
    "South Carolina",
    "South Dakota",
    "Tennessee",
    "Texas",
    "Utah",
    "Vermont",
    "Virginia",
    "Washington",
    "West Virginia",
    "Wisconsin",
    "Wyoming",
];

/// Fault code for calls with the wrong number of parameters
pub const PARAMS_FAULT_CODE: i64 = 4;
/// Fault code for a state number outside 1..=50
pub const STATE_FAULT_CODE: i64 = 5;

fn expect_params(params: &[Value], count: usize) -> Result<(), HandlerError> {
    if params.len() == count {
        Ok(())
    } else if params.len() > count {
        Err(Fault::new(PARAMS_FAULT_CODE, "Too many parameters.").into())
    } else {
        Err(Fault::new(PARAMS_FAULT_CODE, "Too few parameters.").into())
    }
}

/// `examples.getStateName(n)`: the n-th state in alphabetical order, from 1.
fn get_state_name(params: &[Value]) -> Result<Value, HandlerError> {
    expect_params(params, 1)?;
    let index = params[0].expect_i64()?;
    usize::try_from(index)
        .ok()
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| STATES.get(i))
        .map(|name| Value::from(*name))
        .ok_or_else(|| {
            Fault::new(
                STATE_FAULT_CODE,
                format!("State number {} is out of range 1..50", index),
            )
            .into()
        })
}

/// `add(a, b)`: integer sum.
fn add(params: &[Value]) -> Result<Value, HandlerError> {
    expect_params(params, 2)?;
    let left = params[0].expect_i64()?;
    let right = params[1].expect_i64()?;
    left.checked_add(right)
        .map(Value::Int)
        .ok_or_else(|| HandlerError::Other(format!("{} + {} overflows", left, right)))
}

/// A dispatcher with the demonstration methods registered.
pub fn demo_dispatcher() -> Dispatcher {
    let mut dispatcher = Dispatcher::new();
    dispatcher
        .register("examples.getStateName", get_state_name)
        .register("add", add);
    dispatcher
}
