use crate::codec::RichValue;
use crate::error::{HandlerError, RegistryError};
use crate::procedure::{NoInput, ProcedureRegistry};

use std::time::Duration;

use futures_util::stream;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct EchoInput {
    message: String,
}

pub(crate) fn register(
    registry: &mut ProcedureRegistry,
    tick_interval: Duration,
) -> Result<(), RegistryError> {
    registry.mutation("example.echo", |input: EchoInput| async move {
        Ok::<_, HandlerError>(RichValue::object([("echoed", input.message)]))
    })?;

    // 0, 1, 2, ... forever. The first value is immediate.
    registry.subscription("example.ticks", move |_: NoInput| async move {
        let ticks = stream::unfold(0_u64, move |tick| async move {
            if tick > 0 {
                tokio::time::sleep(tick_interval).await;
            }
            Some((Ok::<_, HandlerError>(tick), tick + 1))
        });
        Ok::<_, HandlerError>(ticks)
    })?;

    Ok(())
}
