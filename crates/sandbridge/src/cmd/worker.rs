use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sandbridge_endpoint::{
    Dispatcher, Endpoint, EndpointError, FunctionRegistration, MessageKind, RefId,
};
use sandbridge_wire as wire;

use crate::cmd::WorkerArgs;
use crate::exit::{endpoint_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_message, OutputFormat};
use crate::values::{values_from_json, values_to_json};

pub fn run(args: WorkerArgs, format: OutputFormat) -> CliResult<i32> {
    let mut endpoint =
        Endpoint::connect(&args.path).map_err(|err| endpoint_error("connect failed", err))?;

    endpoint
        .send(MessageKind::WorkerProcessReady, &wire::encode(&[]))
        .map_err(|err| endpoint_error("ready announcement failed", err))?;

    let registrations: Arc<Mutex<HashMap<String, RefId>>> = Arc::new(Mutex::new(HashMap::new()));
    let mut dispatcher = worker_dispatcher(format, registrations.clone());

    let Some(name) = args.call else {
        // Answer calls and print messages until the controller goes away.
        endpoint
            .serve(&mut dispatcher)
            .map_err(|err| endpoint_error("receive failed", err))?;
        return Ok(SUCCESS);
    };

    let call_args = values_from_json(&args.args)?;
    loop {
        let func = registrations
            .lock()
            .map_err(|_| CliError::new(FAILURE, "registration table poisoned"))?
            .get(&name)
            .copied();

        if let Some(func) = func {
            let results = endpoint
                .call(&mut dispatcher, func, args.context, &call_args)
                .map_err(|err| endpoint_error("call failed", err))?;
            println!("{}", values_to_json(&results));
            return Ok(SUCCESS);
        }

        match endpoint.pump(&mut dispatcher) {
            Ok(()) => {}
            Err(EndpointError::PeerLost) => {
                return Err(CliError::new(
                    FAILURE,
                    format!("controller exited before registering {name:?}"),
                ))
            }
            Err(err) => return Err(endpoint_error("receive failed", err)),
        }
    }
}

fn worker_dispatcher(
    format: OutputFormat,
    registrations: Arc<Mutex<HashMap<String, RefId>>>,
) -> Dispatcher {
    let mut dispatcher = Dispatcher::new();

    dispatcher.register(MessageKind::ScriptFunctionRegister, move |endpoint, payload| {
        let registration = FunctionRegistration::decode(&payload)?;
        print_message(
            MessageKind::ScriptFunctionRegister,
            &payload,
            endpoint.peer_label(),
            format,
        );
        if let Ok(mut table) = registrations.lock() {
            table.insert(registration.name, registration.func);
        }
        Ok(())
    });

    dispatcher.register(MessageKind::ModuleRequire, move |endpoint, payload| {
        print_message(
            MessageKind::ModuleRequire,
            &payload,
            endpoint.peer_label(),
            format,
        );
        Ok(())
    });

    dispatcher.register(MessageKind::ScriptMessage, move |endpoint, payload| {
        print_message(
            MessageKind::ScriptMessage,
            &payload,
            endpoint.peer_label(),
            format,
        );
        Ok(())
    });

    dispatcher
}
