use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use sandbridge_endpoint::{
    ConnectionAcceptor, Dispatcher, EndpointError, FunctionRegistration, MessageKind, Role,
};

use crate::cmd::ListenArgs;
use crate::exit::{endpoint_error, CliError, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let mut acceptor =
        ConnectionAcceptor::bind(&args.cache_dir).map_err(|err| endpoint_error("bind failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let printed = Arc::new(AtomicUsize::new(0));
    let mut dispatcher = print_dispatcher(format, args.kinds.clone(), printed.clone());

    while running.load(Ordering::SeqCst) {
        let mut endpoint = match acceptor.accept() {
            Ok(endpoint) => endpoint,
            Err(err) => return Err(endpoint_error("accept failed", err)),
        };

        if let Some(name) = &args.register {
            let func = endpoint.export(|_, call_args| Ok(call_args.to_vec()));
            let registration = FunctionRegistration {
                name: name.clone(),
                func,
            };
            endpoint
                .send(MessageKind::ScriptFunctionRegister, &registration.encode())
                .map_err(|err| endpoint_error("registration failed", err))?;
        }

        while running.load(Ordering::SeqCst) {
            match endpoint.pump(&mut dispatcher) {
                Ok(()) => {}
                Err(EndpointError::PeerLost) => break,
                Err(err) => return Err(endpoint_error("receive failed", err)),
            }

            if let Some(count) = args.count {
                if printed.load(Ordering::SeqCst) >= count {
                    return Ok(SUCCESS);
                }
            }
        }
    }

    Ok(SUCCESS)
}

/// Dispatcher that prints every controller-receivable message. The
/// bridge kinds stay inside the endpoint and need no handlers here.
fn print_dispatcher(
    format: OutputFormat,
    kinds: Option<Vec<String>>,
    printed: Arc<AtomicUsize>,
) -> Dispatcher {
    let mut dispatcher = Dispatcher::new();
    for kind in MessageKind::ALL {
        if !kind.receivable_by(Role::Controller) {
            continue;
        }
        if matches!(
            kind,
            MessageKind::Call | MessageKind::CallReply | MessageKind::Release
        ) {
            continue;
        }

        let kinds = kinds.clone();
        let printed = Arc::clone(&printed);
        dispatcher.register(kind, move |endpoint, payload| {
            let wanted = kinds
                .as_ref()
                .map_or(true, |names| names.iter().any(|name| name == kind.name()));
            if wanted {
                print_message(kind, &payload, endpoint.peer_label(), format);
                printed.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        });
    }
    dispatcher
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
