use sandbridge_endpoint::Endpoint;
use sandbridge_wire::Value;

use crate::cmd::SendArgs;
use crate::exit::{endpoint_error, CliResult, SUCCESS};
use crate::values::{kind_by_name, values_from_json};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let kind = kind_by_name(&args.kind)?;

    let values = match (&args.json, &args.data) {
        (Some(json), _) => values_from_json(json)?,
        (_, Some(data)) => vec![Value::Str(data.clone())],
        (None, None) => vec![],
    };

    let mut endpoint =
        Endpoint::connect(&args.path).map_err(|err| endpoint_error("connect failed", err))?;
    endpoint
        .send_values(kind, &values)
        .map_err(|err| endpoint_error("send failed", err))?;

    Ok(SUCCESS)
}
